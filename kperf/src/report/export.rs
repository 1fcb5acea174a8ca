use std::borrow::Cow;
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::aggregate::ProfileAggregate;
use crate::BoxError;

/// Per-sample `url,time_ms,size_bytes` rows for offline plotting.
///
/// Rows follow arrival order. The file is appended to, never truncated, so
/// several runs can share one file.
#[derive(Debug, Clone)]
pub struct CsvExporter {
    path: PathBuf,
    url: String,
}

impl CsvExporter {
    pub fn new(path: impl Into<PathBuf>, url: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            url: url.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row per successful sample of `agg` to the file.
    pub fn export(&self, agg: &ProfileAggregate) -> Result<usize, BoxError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let rows = self.write_to(file, agg)?;
        tracing::info!(path = %self.path.display(), rows, "exported samples");
        Ok(rows)
    }

    pub fn write_to<W: io::Write>(&self, out: W, agg: &ProfileAggregate) -> Result<usize, BoxError> {
        let mut writer = BufWriter::new(out);
        let url = quote(&self.url);
        let mut rows = 0;
        for (time, size) in agg.response_times.iter().zip(&agg.response_sizes) {
            writeln!(writer, "{url},{time},{size}")?;
            rows += 1;
        }
        writer.flush()?;
        Ok(rows)
    }
}

/// RFC 4180 quoting, only when the field needs it.
fn quote(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregate() -> ProfileAggregate {
        ProfileAggregate {
            response_times: vec![12, 7],
            response_sizes: vec![512, 2_048],
            ..ProfileAggregate::default()
        }
    }

    #[test]
    fn one_row_per_sample() {
        let exporter = CsvExporter::new("unused.csv", "https://example.com/");
        let mut buf = Vec::new();
        let rows = exporter.write_to(&mut buf, &aggregate()).unwrap();
        assert_eq!(rows, 2);
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "https://example.com/,12,512\nhttps://example.com/,7,2048\n"
        );
    }

    #[test]
    fn export_appends() {
        let path = std::env::temp_dir().join(format!("kperf-export-{}.csv", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let exporter = CsvExporter::new(&path, "a.test");

        exporter.export(&aggregate()).unwrap();
        exporter.export(&aggregate()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 4);
        assert!(content.starts_with("a.test,12,512\n"));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn url_with_comma_is_quoted() {
        assert_eq!(quote("https://a.test/?q=1,2"), "\"https://a.test/?q=1,2\"");
        assert_eq!(quote("say \"hi\","), "\"say \"\"hi\"\",\"");
        assert_eq!(quote("plain"), "plain");
    }
}
