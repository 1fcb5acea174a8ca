use std::io::Write;

use tokio::sync::mpsc;

/// A progress display. Only ever driven by one task.
pub trait Progress: Send {
    /// One unit of work finished.
    fn tick(&mut self);
    fn finish(&mut self);
}

/// `\r`-rewritten single-line counter: `  Progress: 12/100 (12.0%)`.
#[derive(Debug)]
pub struct ProgressLine<W> {
    out: W,
    done: u64,
    total: u64,
}

impl<W: Write> ProgressLine<W> {
    pub fn new(out: W, total: u64) -> Self {
        Self {
            out,
            done: 0,
            total,
        }
    }

    pub fn done(&self) -> u64 {
        self.done
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Progress for ProgressLine<W> {
    fn tick(&mut self) {
        self.done += 1;
        let pct = if self.total == 0 {
            100.0
        } else {
            self.done as f64 * 100.0 / self.total as f64
        };
        // The display is best effort.
        let _ = write!(
            self.out,
            "\r  Progress: {}/{} ({:.1}%)",
            self.done, self.total, pct
        );
        let _ = self.out.flush();
    }

    fn finish(&mut self) {
        let _ = writeln!(self.out);
        let _ = self.out.flush();
    }
}

/// Sole consumer of progress notifications. Returns the sink once every sender is gone.
pub async fn progress_task<P: Progress>(mut rx: mpsc::UnboundedReceiver<()>, mut sink: P) -> P {
    while rx.recv().await.is_some() {
        sink.tick();
    }
    sink.finish();
    sink
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_counter() {
        let mut line = ProgressLine::new(Vec::new(), 4);
        line.tick();
        line.tick();
        line.finish();
        let out = String::from_utf8(line.into_inner()).unwrap();
        assert_eq!(
            out,
            "\r  Progress: 1/4 (25.0%)\r  Progress: 2/4 (50.0%)\n"
        );
    }

    #[tokio::test]
    async fn task_counts_every_notification() {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(progress_task(rx, ProgressLine::new(Vec::new(), 30)));
        let senders: Vec<_> = (0..3).map(|_| tx.clone()).collect();
        drop(tx);
        for sender in senders {
            tokio::spawn(async move {
                for _ in 0..10 {
                    sender.send(()).unwrap();
                }
            });
        }
        let line = handle.await.unwrap();
        assert_eq!(line.done(), 30);
    }
}
