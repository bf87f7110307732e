//! Cooperative stop signal
//!
//! A [`StopHandle`] is held by whoever may end the harvest early (the Ctrl-C
//! listener in the binary, tests). Every loop and worker holds a
//! [`StopSignal`] and checks it between units of work. Stopping never aborts
//! a write that is already in the store's queue.

use std::future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Sending side of the stop signal
#[derive(Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

/// Receiving side of the stop signal
#[derive(Clone)]
pub struct StopSignal {
    rx: watch::Receiver<bool>,
}

/// Creates a connected handle and signal
pub fn stop_channel() -> (StopHandle, StopSignal) {
    let (tx, rx) = watch::channel(false);
    (StopHandle { tx: Arc::new(tx) }, StopSignal { rx })
}

impl StopHandle {
    /// Requests a stop; later calls have no further effect
    pub fn stop(&self) {
        if !self.tx.send_replace(true) {
            tracing::info!("Stop requested, finishing in-flight work");
        }
    }

    /// A new signal observing this handle
    pub fn signal(&self) -> StopSignal {
        StopSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl StopSignal {
    /// A signal that is never raised
    pub fn never() -> Self {
        stop_channel().1
    }

    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Completes once a stop is requested
    ///
    /// Pends forever when every handle is gone without stopping.
    pub async fn stopped(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                future::pending::<()>().await;
            }
        }
    }

    /// Sleeps for `duration` unless stopped first
    ///
    /// # Returns
    ///
    /// `true` if the full duration elapsed, `false` if the sleep was cut short
    pub async fn sleep(&self, duration: Duration) -> bool {
        if duration.is_zero() {
            return !self.is_stopped();
        }

        tokio::select! {
            biased;
            _ = self.stopped() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}
