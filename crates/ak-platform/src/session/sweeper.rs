//! Session timeout sweeper - periodically deletes expired session records

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::session::service::UserSessionService;

pub struct SessionTimeoutSweeper {
    service: UserSessionService,
    sweep_interval: Duration,
    running: Arc<RwLock<bool>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl SessionTimeoutSweeper {
    pub fn new(service: UserSessionService, sweep_interval: Duration) -> Self {
        Self {
            service,
            sweep_interval,
            running: Arc::new(RwLock::new(false)),
            handle: Mutex::new(None),
        }
    }

    /// Spawn the sweep loop. The first sweep runs after one full interval.
    pub async fn start(&self) {
        let mut running = self.running.write().await;
        if *running {
            warn!("Session timeout sweeper already running");
            return;
        }
        *running = true;
        drop(running);

        info!(
            sweep_interval_secs = self.sweep_interval.as_secs(),
            "Starting session timeout sweeper"
        );

        let service = self.service.clone();
        let sweep_interval = self.sweep_interval;
        let running = self.running.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval(sweep_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval fires immediately on the first tick
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if !*running.read().await {
                    break;
                }
                sweep(&service).await;
            }
            debug!("Session timeout sweeper stopped");
        });
        *self.handle.lock().await = Some(handle);
    }

    pub async fn stop(&self) {
        info!("Stopping session timeout sweeper");
        let mut running = self.running.write().await;
        *running = false;
        drop(running);

        if let Some(handle) = self.handle.lock().await.take() {
            handle.abort();
        }
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Run one sweep now
    pub async fn run_once(&self) -> u64 {
        sweep(&self.service).await
    }
}

async fn sweep(service: &UserSessionService) -> u64 {
    match service.delete_timeout_sessions().await {
        Ok(count) => {
            if count == 0 {
                debug!("No timed out sessions");
            }
            count
        }
        Err(e) => {
            error!(error = %e, "Session timeout sweep failed");
            0
        }
    }
}
