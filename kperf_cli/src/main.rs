mod cli;

use std::time::Duration;

use anyhow::anyhow;
use clap::Parser;
use kperf::{
    aggregate::{GetAggregate, ProfileAggregate},
    http::HttpVersion,
    report::{
        BodyReporter, CsvExporter, GetReport, JsonReporter, NumberFormat, ProfileReport,
        StdoutReporter,
    },
    QueueExecutor, Reporter, Scenario, Shutdown,
};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, GetArgs, ProfileArgs, Target};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose());

    let (shutdown, trigger) = Shutdown::new();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, waiting for in-flight requests");
            let _ = trigger.send(true);
        }
    });

    match cli.command {
        Command::Profile(args) => profile(args, shutdown).await,
        Command::Get(args) => get(args, shutdown).await,
    }
}

/// `RUST_LOG` wins; otherwise warnings only, or debug output for kperf itself with `--verbose`.
fn init_tracing(verbose: bool) {
    let fallback = if verbose { "warn,kperf=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn version(target: &Target) -> HttpVersion {
    if target.http10 {
        HttpVersion::Http10
    } else {
        HttpVersion::Http11
    }
}

async fn profile(args: ProfileArgs, shutdown: Shutdown) -> anyhow::Result<()> {
    let executor = QueueExecutor::builder()
        .requests(args.requests)
        .workers(args.workers as usize)
        .sleep(Duration::from_secs(args.sleep))
        .progress(!args.json)
        .build();
    let aggregate: ProfileAggregate = Scenario::builder()
        .name(format!("profile {}", args.target.url))
        .url(args.target.url.clone())
        .version(version(&args.target))
        .verbose(args.target.verbose)
        .shutdown(shutdown)
        .executor(executor)
        .build()
        .run()
        .await
        .map_err(|e| anyhow!(e))?;

    if let Some(path) = &args.csv {
        let exporter = CsvExporter::new(path, args.target.url.as_str());
        exporter
            .export(&aggregate)
            .map_err(|e| anyhow!(e).context(format!("writing {}", exporter.path().display())))?;
    }

    let report = ProfileReport::from(aggregate);
    let printed = if args.json {
        JsonReporter.report(report).await
    } else {
        StdoutReporter::new(NumberFormat::english()).report(report).await
    };
    printed.map_err(|e| anyhow!(e))
}

async fn get(args: GetArgs, shutdown: Shutdown) -> anyhow::Result<()> {
    let GetArgs { target } = args;
    let executor = QueueExecutor::builder().requests(1).workers(1).build();
    let aggregate: GetAggregate = Scenario::builder()
        .name(format!("get {}", target.url))
        .url(target.url.clone())
        .version(version(&target))
        .verbose(target.verbose)
        .keep_body(true)
        .capture_heads(target.verbose)
        .shutdown(shutdown)
        .executor(executor)
        .build()
        .run()
        .await
        .map_err(|e| anyhow!(e))?;

    BodyReporter::default()
        .report(GetReport::from(aggregate))
        .await
        .map_err(|e| anyhow!(e))
}
