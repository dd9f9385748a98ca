use citegraph_core::FilterEvent;
use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::events::pacer::spawn_pacer;
use crate::graph::state::{EngineState, PlaybackPhase};

impl EngineState {
    // Single mutation entry point. Rejected operations log and leave prior
    // state untouched.
    pub fn apply(&mut self, event: FilterEvent) {
        match event {
            FilterEvent::ClusterSelectionChanged { selected } => {
                if let Err(e) = self.set_cluster_mask(&selected) {
                    tracing::warn!(error = %e, "cluster selection rejected");
                }
            }
            FilterEvent::YearRangeChanged { from, to } => {
                if let Err(e) = self.set_year_mask(from, to) {
                    tracing::warn!(error = %e, "year range rejected");
                }
            }
            FilterEvent::SearchQueryExecuted { matched } => {
                if let Err(e) = self.set_search_highlight(&matched) {
                    tracing::warn!(error = %e, "search highlight rejected");
                }
            }
            FilterEvent::PlaybackStartRequested { from, to, selected } => {
                if let Err(e) = self.start_playback(from, to, selected) {
                    tracing::warn!(error = %e, "playback start rejected");
                }
            }
            FilterEvent::PlaybackStopRequested => self.stop_playback(),
            FilterEvent::PlaybackTickDue => {
                let _ = self.playback_tick();
            }
        }
    }
}

pub fn drain_events(state: &mut EngineState, rx: &Receiver<FilterEvent>) {
    while let Ok(event) = rx.try_recv() {
        state.apply(event);
    }
}

// Serializes every mutation through one FIFO channel; playback ticks arrive
// on the same channel as user filter events, so a tick never interleaves
// with a mask write.
pub struct EngineLoop {
    pub state: EngineState,
    rx: Receiver<FilterEvent>,
    tx: Sender<FilterEvent>,
}

impl EngineLoop {
    pub fn new(state: EngineState) -> Self {
        let (tx, rx) = unbounded();
        Self { state, rx, tx }
    }

    pub fn sender(&self) -> Sender<FilterEvent> {
        self.tx.clone()
    }

    pub fn pump(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            let was_playing = self.state.playback.phase == PlaybackPhase::Playing;
            self.state.apply(event);
            if !was_playing && self.state.playback.phase == PlaybackPhase::Playing {
                spawn_pacer(
                    self.tx.clone(),
                    self.state.cfg.playback_step_delay(),
                    self.state.playback.abort.clone(),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::state::fixtures::five_node_dataset;
    use crate::util::config::EngineConfig;
    use std::collections::HashSet;

    fn loaded_state() -> EngineState {
        let cfg = EngineConfig {
            start_year: 2000,
            end_year: 2020,
            edge_shuffle_seed: Some(11),
            // keep any spawned pacer asleep for the whole test
            playback_step_delay_ms: 60_000,
            ..EngineConfig::default()
        };
        let mut st = EngineState::new(cfg);
        st.load_dataset(&five_node_dataset(), None)
            .expect("load dataset");
        st
    }

    #[test]
    fn events_apply_in_arrival_order() {
        let (tx, rx) = unbounded();
        let mut st = loaded_state();

        let only_zero: HashSet<u32> = [0].into_iter().collect();
        tx.send(FilterEvent::ClusterSelectionChanged {
            selected: only_zero,
        })
        .expect("send");
        tx.send(FilterEvent::YearRangeChanged {
            from: 2000,
            to: 2005,
        })
        .expect("send");

        drain_events(&mut st, &rx);

        // cluster 0 = {n0, n2}, then the year window drops n2 (2010)
        let visible: Vec<usize> = st
            .store
            .as_ref()
            .expect("store")
            .node_visibility_buffer()
            .iter()
            .enumerate()
            .filter(|(_, &v)| v == 1.0)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(visible, vec![0]);
    }

    #[test]
    fn rejected_events_leave_state_unchanged() {
        let mut st = EngineState::default();
        st.apply(FilterEvent::YearRangeChanged {
            from: 2000,
            to: 2010,
        });
        st.apply(FilterEvent::PlaybackStartRequested {
            from: 2000,
            to: 2010,
            selected: [0u32].into_iter().collect(),
        });
        assert!(st.store.is_none());
        assert_eq!(st.playback.phase, PlaybackPhase::Idle);
    }

    #[test]
    fn stray_ticks_are_harmless() {
        let mut st = loaded_state();
        let before = st
            .store
            .as_ref()
            .expect("store")
            .node_visibility_buffer()
            .to_vec();
        st.apply(FilterEvent::PlaybackTickDue);
        let after = st
            .store
            .as_ref()
            .expect("store")
            .node_visibility_buffer()
            .to_vec();
        assert_eq!(before, after);
    }

    #[test]
    fn loop_pump_runs_a_full_playback() {
        let mut lp = EngineLoop::new(loaded_state());
        let tx = lp.sender();
        tx.send(FilterEvent::PlaybackStartRequested {
            from: 2000,
            to: 2020,
            selected: [0u32, 1].into_iter().collect(),
        })
        .expect("send start");
        lp.pump();
        assert_eq!(lp.state.playback.phase, PlaybackPhase::Playing);

        // Stand in for the pacer: tick until the reveal completes.
        while lp.state.playback.phase == PlaybackPhase::Playing {
            tx.send(FilterEvent::PlaybackTickDue).expect("send tick");
            lp.pump();
        }
        assert_eq!(lp.state.playback.phase, PlaybackPhase::Completed);
        let visible = lp
            .state
            .store
            .as_ref()
            .expect("store")
            .node_visibility_buffer()
            .iter()
            .filter(|&&v| v == 1.0)
            .count();
        assert_eq!(visible, 5);
    }
}
