use tokio::sync::watch::{self, Receiver, Sender};

/// Cancellation signal shared by a run.
///
/// Backed by a `watch` channel carrying `true` once shutdown is requested. A
/// signal whose sender is gone (or that never had one) never fires.
#[derive(Clone, Debug, Default)]
pub struct Shutdown {
    rx: Option<Receiver<bool>>,
}

impl Shutdown {
    pub fn new() -> (Self, Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { rx: Some(rx) }, tx)
    }

    /// A signal that is never raised.
    pub fn never() -> Self {
        Self { rx: None }
    }

    pub fn is_triggered(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once shutdown has been requested; pends forever otherwise.
    pub async fn triggered(&mut self) {
        if let Some(rx) = self.rx.as_mut() {
            if rx.wait_for(|b| *b).await.is_ok() {
                return;
            }
        }
        std::future::pending::<()>().await
    }
}
