use tokio::sync::oneshot;

/// Held by whoever represents the caller. Dropping it signals a disconnect.
#[derive(Debug)]
pub struct CallerGuard {
    _alive: oneshot::Sender<()>,
}

/// Observes whether the caller is still waiting for the saga.
///
/// Only the attestation confirmation wait listens to this; every other step
/// runs to completion once verification has succeeded.
#[derive(Debug)]
pub struct Disconnect {
    rx: Option<oneshot::Receiver<()>>,
    fired: bool,
}

impl Disconnect {
    pub fn pair() -> (CallerGuard, Disconnect) {
        let (tx, rx) = oneshot::channel();
        (
            CallerGuard { _alive: tx },
            Disconnect {
                rx: Some(rx),
                fired: false,
            },
        )
    }

    /// A signal that never fires.
    pub fn never() -> Self {
        Self {
            rx: None,
            fired: false,
        }
    }

    pub fn is_disconnected(&self) -> bool {
        self.fired
    }

    /// Resolves once the caller has gone away.
    pub async fn wait(&mut self) {
        if self.fired {
            return;
        }
        match self.rx.as_mut() {
            Some(rx) => {
                let _ = rx.await;
                self.rx = None;
                self.fired = true;
            }
            None => std::future::pending().await,
        }
    }
}
