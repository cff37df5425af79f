use tokio::sync::watch;

/// Page-unload signal. Every long-running task holds a listener and stops at
/// its next suspension point once triggered.
#[derive(Clone)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

#[derive(Clone)]
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self {
            tx: watch::Sender::new(false),
        }
    }
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

impl ShutdownListener {
    /// Resolves immediately when the signal already fired before subscription.
    pub async fn notified(&mut self) {
        let _ = self.rx.wait_for(|fired| *fired).await;
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }
}

/// Ctrl+C or SIGTERM unloads the page.
pub fn install_signal_handlers(shutdown: Shutdown) {
    tokio::spawn(async move {
        let reason = wait_for_signal().await;
        tracing::info!(target: "lifecycle", reason, "shutdown signal received");
        shutdown.trigger();
    });
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let Ok(mut term) = signal(SignalKind::terminate()) else {
        let _ = tokio::signal::ctrl_c().await;
        return "ctrl-c";
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => "ctrl-c",
        _ = term.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    let _ = tokio::signal::ctrl_c().await;
    "ctrl-c"
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn late_listeners_see_an_earlier_trigger() {
        let shutdown = Shutdown::new();
        let early = shutdown.subscribe();
        shutdown.trigger();

        let mut late = shutdown.subscribe();
        assert!(early.is_triggered());
        assert!(late.is_triggered());
        tokio::time::timeout(Duration::from_millis(100), late.notified())
            .await
            .expect("already triggered");
    }

    #[test]
    fn default_starts_untriggered() {
        let shutdown = Shutdown::default();
        assert!(!shutdown.subscribe().is_triggered());
    }

    #[tokio::test]
    async fn waiting_listener_wakes_on_trigger() {
        let shutdown = Shutdown::new();
        let mut listener = shutdown.subscribe();
        let waiter = tokio::spawn(async move { listener.notified().await });

        shutdown.trigger();
        tokio::time::timeout(Duration::from_millis(100), waiter)
            .await
            .expect("woken")
            .unwrap();
    }
}
