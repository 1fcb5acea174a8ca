use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "kperf", version)]
#[command(about = "Profile a website with plain HTTP/1.x GET requests")]
#[command(after_help = "Examples:\n  kperf get -u https://example.com/links\n  kperf profile --url=example.com -p 1000 -w 100")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send many GET requests and print a profiling summary
    Profile(ProfileArgs),
    /// Send one GET request and print the response body
    Get(GetArgs),
}

/// Flags shared by every subcommand.
#[derive(Args, Debug)]
pub struct Target {
    /// Request URL; `https://` is assumed when no scheme is given
    #[arg(short = 'u', long)]
    pub url: String,

    /// Use HTTP/1.0 instead of HTTP/1.1
    #[arg(short = 'z', long)]
    pub http10: bool,

    /// Print failed requests (profile) or the raw request and response heads (get)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

#[derive(Args, Debug)]
pub struct ProfileArgs {
    #[command(flatten)]
    pub target: Target,

    /// Number of requests
    #[arg(short = 'p', long = "np", default_value_t = 100)]
    pub requests: usize,

    /// Number of concurrent workers
    #[arg(short = 'w', long = "nw", default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..))]
    pub workers: u32,

    /// Upper bound, in seconds, of the random pause between two requests of one worker
    #[arg(short = 's', long, default_value_t = 0)]
    pub sleep: u64,

    /// Append `url,time_ms,size_bytes` rows to this file
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    #[command(flatten)]
    pub target: Target,
}

impl Cli {
    pub fn verbose(&self) -> bool {
        match &self.command {
            Command::Profile(args) => args.target.verbose,
            Command::Get(args) => args.target.verbose,
        }
    }
}
