//! Process shutdown wiring.
//!
//! The server registers one [`ShutdownHook`] at startup. Whatever triggers
//! it first (Ctrl-C, SIGTERM, or an explicit [`ShutdownHook::fire`]) runs
//! the callback; later triggers are no-ops.

use crate::config::RuntimeEnv;
use crate::scrapers::ScrapeOrchestrator;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

type Callback = Box<dyn FnOnce() + Send>;

pub struct ShutdownHook {
    fired: AtomicBool,
    callback: Mutex<Option<Callback>>,
    listen_for_signals: bool,
}

impl std::fmt::Debug for ShutdownHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownHook")
            .field("fired", &self.fired.load(Ordering::SeqCst))
            .field("listen_for_signals", &self.listen_for_signals)
            .finish()
    }
}

impl ShutdownHook {
    pub fn new<F>(callback: F, listen_for_signals: bool) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            fired: AtomicBool::new(false),
            callback: Mutex::new(Some(Box::new(callback))),
            listen_for_signals,
        }
    }

    /// Hook that stops `orchestrator` on shutdown.
    ///
    /// Signal listening is skipped in the `test` environment.
    pub fn register(environment: RuntimeEnv, orchestrator: Arc<dyn ScrapeOrchestrator>) -> Self {
        let listen = environment != RuntimeEnv::Test;
        info!(?environment, listen, "Registering shutdown hook");
        Self::new(move || orchestrator.stop_scrapers(), listen)
    }

    /// Run the callback if nobody has yet. Returns whether this call ran it.
    pub fn fire(&self) -> bool {
        if self.fired.swap(true, Ordering::SeqCst) {
            return false;
        }
        let callback = self
            .callback
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(callback) = callback {
            callback();
        }
        true
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Wait for Ctrl-C or SIGTERM, then fire the hook.
    ///
    /// Without signal listening this never resolves, so the server only stops
    /// when its task is dropped.
    pub async fn wait_for_signal(self: Arc<Self>) {
        if !self.listen_for_signals {
            std::future::pending::<()>().await;
        }

        shutdown_signal().await;
        if self.fire() {
            info!("Shutdown hook ran");
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Unable to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Unable to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => warn!("Received Ctrl-C"),
        _ = terminate => warn!("Received SIGTERM"),
    }
}
