use citegraph_core::FilterEvent;
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

// Delivers PlaybackTickDue on a fixed cadence until the abort flag rises or
// the receiving side goes away. Ticks travel through the same channel as
// filter events, so the engine loop serializes them.
pub fn spawn_pacer(tx: Sender<FilterEvent>, step_delay: Duration, abort: Arc<AtomicBool>) {
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .expect("tokio runtime");
        rt.block_on(async move {
            loop {
                tokio::time::sleep(step_delay).await;
                if abort.load(Ordering::Relaxed) {
                    break;
                }
                if tx.send(FilterEvent::PlaybackTickDue).is_err() {
                    break;
                }
            }
        });
    });
}
