use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, info_span, Instrument};
use crate::state::AppState;

/// Scheduler driver: runs the email processor every tick and the reconciliation
/// sweep every `reconcile_every_ticks` ticks.
pub async fn start_background_worker(state: Arc<AppState>) {
    let interval = Duration::from_secs(state.config.worker_interval_secs.max(1));
    let reconcile_every = state.config.reconcile_every_ticks.max(1) as u64;
    info!(interval_secs = interval.as_secs(), reconcile_every, "Starting scheduler driver...");

    let mut tick: u64 = 0;
    loop {
        tick += 1;
        let span = info_span!("scheduler_tick", tick);
        run_tick(&state, tick % reconcile_every == 0).instrument(span).await;
        sleep(interval).await;
    }
}

async fn run_tick(state: &AppState, reconcile: bool) {
    if reconcile {
        match state.booking_service.reconcile(state.clock.now()).await {
            Ok(replayed) => info!(replayed, "Reconciliation sweep completed"),
            Err(e) => error!("Reconciliation sweep failed: {:?}", e),
        }
    }

    if let Err(e) = state.email_processor.process_pending_emails().await {
        error!("Failed to process pending emails: {:?}", e);
    }
}
