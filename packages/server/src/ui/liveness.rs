//! Periodic liveness sweep.

use std::{sync::Arc, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

use crate::{domain::SessionRegistry, usecase::HeartbeatUseCase};

/// Start the liveness monitor. Abort the returned handle to stop it.
pub fn spawn_liveness_monitor(
    registry: Arc<dyn SessionRegistry>,
    interval: Duration,
    timeout: Duration,
) -> JoinHandle<()> {
    let heartbeat = HeartbeatUseCase::new(registry, timeout);
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            heartbeat.sweep().await;
        }
    })
}
