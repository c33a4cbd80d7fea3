use crate::queue::receiver::QueueReceiver;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

/// Starts/stops N receivers in parallel and waits for a graceful shutdown
/// (spec §4.J).
pub struct WorkerHost {
    stop_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerHost {
    /// Spawns one task per receiver; all run concurrently and share a
    /// single stop signal.
    #[must_use]
    pub fn start(receivers: Vec<QueueReceiver>) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let handles = receivers
            .into_iter()
            .map(|receiver| {
                let stop_rx = stop_rx.clone();
                tokio::spawn(async move { receiver.run(stop_rx).await })
            })
            .collect();
        info!("worker host started");
        Self { stop_tx, handles }
    }

    /// Signals every receiver to stop and waits for all of them to return.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        for handle in self.handles {
            let _ = handle.await;
        }
        info!("worker host stopped");
    }
}
