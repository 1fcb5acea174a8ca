use std::collections::BTreeMap;
use std::io::{self, Write};

use async_trait::async_trait;
use colored::{Color, Colorize};

use super::table::Table;
use super::{GetReport, NumberFormat, ProfileReport, Reporter};
use crate::aggregate::{GetAggregate, ProfileAggregate};
use crate::BoxError;

/// Human-readable profile tables on stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutReporter {
    pub format: NumberFormat,
}

impl StdoutReporter {
    pub fn new(format: NumberFormat) -> Self {
        Self { format }
    }

    pub fn render(&self, report: &ProfileReport) -> String {
        let f = &self.format;
        if report.requests == 0 && report.failures == 0 {
            return "No Result.\n".to_string();
        }

        let mut out = String::from("\n");
        out.push_str(&format!("The number of requests: {}\n", f.int(report.requests)));
        out.push_str(&format!(
            "The success rate is: {:.1} %\n",
            report.success_rate
        ));

        if report.requests > 0 {
            out.push_str(&status_table(&report.status, f));
        }
        if let Some(time) = report.time {
            out.push_str("\nThe Summary of Time to First Byte (ms):\n");
            let mut table = Table::new(["fast", "slow", "mean", "median"]);
            table.row(
                vec![f.int(time.fastest), f.int(time.slowest), f.int(time.mean), f.int(time.median)],
                None,
            );
            out.push_str(&table.render());
        }
        if let Some(size) = report.size {
            out.push_str("\nThe Responses Size (bytes):\n");
            let mut table = Table::new(["smallest", "largest"]);
            table.row(vec![f.int(size.smallest), f.int(size.largest)], None);
            out.push_str(&table.render());
        }
        out.push_str(&fatal_errors(&report.fatal_errors, f));
        out
    }
}

#[async_trait]
impl Reporter<ProfileAggregate, ProfileReport> for StdoutReporter {
    async fn report(&self, report: ProfileReport) -> Result<(), BoxError> {
        write_stdout(&self.render(&report))
    }
}

/// Getter output: heads when captured, then the body, then any failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct BodyReporter {
    pub format: NumberFormat,
}

impl BodyReporter {
    pub fn render(&self, report: &GetReport) -> String {
        let mut out = String::new();
        for head in [&report.request_head, &report.response_head].into_iter().flatten() {
            out.push_str(head);
            if !head.ends_with('\n') {
                out.push('\n');
            }
            out.push('\n');
        }
        if let Some(body) = &report.body {
            out.push_str(body);
            out.push('\n');
        }
        out.push_str(&fatal_errors(&report.fatal_errors, &self.format));
        out
    }
}

#[async_trait]
impl Reporter<GetAggregate, GetReport> for BodyReporter {
    async fn report(&self, report: GetReport) -> Result<(), BoxError> {
        write_stdout(&self.render(&report))
    }
}

/// Pretty-printed JSON on stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReporter;

#[async_trait]
impl Reporter<ProfileAggregate, ProfileReport> for JsonReporter {
    async fn report(&self, report: ProfileReport) -> Result<(), BoxError> {
        write_stdout(&format!("{}\n", serde_json::to_string_pretty(&report)?))
    }
}

fn write_stdout(text: &str) -> Result<(), BoxError> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

/// 2xx rows green, everything else red.
fn status_table(status: &BTreeMap<String, u64>, f: &NumberFormat) -> String {
    let mut table = Table::new(["status", "count"]);
    for (st, count) in status {
        let color = if st.starts_with('2') {
            Color::Green
        } else {
            Color::Red
        };
        table.row(vec![st.clone(), f.int(*count)], Some(color));
    }
    table.render()
}

fn fatal_errors(errors: &BTreeMap<String, u64>, f: &NumberFormat) -> String {
    if errors.is_empty() {
        return String::new();
    }
    format!("\n{}\n{}", "Fatal Errors:".bold(), status_table(errors, f))
}
