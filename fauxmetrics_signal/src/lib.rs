//! Module to signal phase changes in fauxmetrics.
//!
//! Generators run forever unless told otherwise. This crate provides the
//! telling: a one-shot signal with a single `Broadcaster` and any number of
//! `Watcher` instances. The signal is used for shutdown, both from the binary
//! on ctrl-c or a bounded run and from tests that need to stop generators
//! deterministically.
//!
//! Dropping the `Broadcaster` without signaling counts as a signal. A
//! `Watcher` that is dropped is considered to have acknowledged the signal,
//! which is what `Broadcaster::signal_and_wait` waits on.

#![deny(clippy::all)]
#![deny(clippy::cargo)]
#![deny(clippy::pedantic)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::dbg_macro)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]
#![deny(missing_copy_implementations)]
#![deny(missing_debug_implementations)]
#![allow(clippy::multiple_crate_versions)]

use tokio::sync::watch;
use tracing::info;

/// Construct a `Watcher` and `Broadcaster` pair.
#[must_use]
pub fn signal() -> (Watcher, Broadcaster) {
    let (sender, receiver) = watch::channel(false);

    let w = Watcher {
        receiver,
        signal_received: false,
    };
    let b = Broadcaster { sender };

    (w, b)
}

#[derive(Debug)]
/// Mechanism to notify one or more `Watcher` instances that a phase has been
/// achieved.
pub struct Broadcaster {
    sender: watch::Sender<bool>,
}

impl Broadcaster {
    /// Send the signal through any `Watcher` instances.
    ///
    /// Function will NOT block until all peers have ack'ed the signal.
    pub fn signal(self) {
        self.sender.send_replace(true);
    }

    /// Send the signal through to any `Watcher` instances.
    ///
    /// Function WILL block until all `Watcher` instances have been dropped.
    pub async fn signal_and_wait(self) {
        self.sender.send_replace(true);

        let peers = self.sender.receiver_count();
        if peers > 0 {
            info!("Waiting for {peers} peers");
        }
        self.sender.closed().await;
    }

    /// The number of live `Watcher` instances.
    #[must_use]
    pub fn peers(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Errors for `Watcher::try_recv`.
#[derive(thiserror::Error, Debug, Clone, Copy)]
pub enum TryRecvError {
    /// The signal has been received and yet `try_recv` was called.
    #[error("signal has been received")]
    SignalReceived,
}

/// Errors for `Watcher::register`.
#[derive(thiserror::Error, Debug, Clone, Copy)]
pub enum RegisterError {
    /// The signal has been received and yet `register` was called.
    #[error("signal has been received")]
    SignalReceived,
}

#[derive(Debug, Clone)]
/// Mechanism to watch for phase changes, typically used to control shutdown.
pub struct Watcher {
    receiver: watch::Receiver<bool>,
    /// Set once this instance has observed the signal.
    signal_received: bool,
}

impl Watcher {
    /// Receive the signal. This function will block if the signal has not
    /// already been sent.
    pub async fn recv(mut self) {
        if self.signal_received {
            tokio::task::yield_now().await;
            return;
        }

        // An error means the `Broadcaster` is gone, which is as good as a
        // signal.
        let _ = self.receiver.wait_for(|fired| *fired).await;
    }

    /// Check if the signal has been sent without blocking.
    ///
    /// If the signal has not been received returns Ok(false). If it has been
    /// received Ok(true). All calls after will return
    /// `TryRecvError::SignalReceived`.
    ///
    /// # Errors
    ///
    /// Returns `TryRecvError::SignalReceived` if the signal has already been
    /// observed by this watcher.
    pub fn try_recv(&mut self) -> Result<bool, TryRecvError> {
        if self.signal_received {
            return Err(TryRecvError::SignalReceived);
        }

        let fired = match self.receiver.has_changed() {
            Ok(_) => *self.receiver.borrow_and_update(),
            Err(_) => true,
        };
        if fired {
            self.signal_received = true;
        }
        Ok(fired)
    }

    /// Register with the `Broadcaster`, returning a new instance of `Watcher`.
    ///
    /// # Errors
    ///
    /// Returns `RegisterError::SignalReceived` if the signal has already been
    /// observed by this watcher.
    pub fn register(&self) -> Result<Self, RegisterError> {
        if self.signal_received {
            return Err(RegisterError::SignalReceived);
        }

        Ok(Self {
            receiver: self.receiver.clone(),
            signal_received: false,
        })
    }
}
