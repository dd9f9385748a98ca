use citegraph_core::{ClusterId, EngineNotice};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::EngineError;
use crate::graph::state::{EngineState, PlaybackPhase, PlaybackState};
use crate::graph::temporal::TemporalCursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    Finished,
}

impl EngineState {
    // ----- Time travel -----
    pub fn start_playback(
        &mut self,
        from: i32,
        to: i32,
        selected: HashSet<ClusterId>,
    ) -> Result<bool, EngineError> {
        let Some(store) = self.store.as_mut() else {
            return Err(EngineError::NotInitialized);
        };
        let Some(index) = self.temporal.as_ref() else {
            return Err(EngineError::NotInitialized);
        };
        if self.playback.phase == PlaybackPhase::Playing {
            tracing::debug!("playback already running, start request ignored");
            return Ok(false);
        }
        if selected.is_empty() {
            return Err(EngineError::NoSelection);
        }

        let (from, to) = if from <= to { (from, to) } else { (to, from) };
        store.fill_node_visibility(0.0);
        store.fill_span_visibility(0.0);
        self.playback = PlaybackState {
            phase: PlaybackPhase::Playing,
            current_year: from,
            to_year: to,
            selected,
            cursor: Some(TemporalCursor::new(index)),
            deferred_spans: Vec::new(),
            abort: Arc::new(AtomicBool::new(false)),
        };
        tracing::info!(from, to, "playback started");
        Ok(true)
    }

    pub fn playback_tick(&mut self) -> StepOutcome {
        if self.playback.phase != PlaybackPhase::Playing {
            return StepOutcome::Finished;
        }
        // Cooperative cancellation: checked before any buffer mutation.
        if self.playback.abort.load(Ordering::Relaxed) {
            self.playback.phase = PlaybackPhase::Stopped;
            return StepOutcome::Finished;
        }
        let (Some(store), Some(index)) = (self.store.as_mut(), self.temporal.as_ref()) else {
            return StepOutcome::Finished;
        };
        let PlaybackState {
            cursor,
            selected,
            current_year,
            deferred_spans,
            ..
        } = &mut self.playback;
        let Some(cursor) = cursor.as_mut() else {
            return StepOutcome::Finished;
        };
        let year = *current_year;

        let mut new_nodes = Vec::new();
        let mut new_spans = Vec::new();
        cursor.advance_to(index, store, year, &mut new_nodes, &mut new_spans);
        new_spans.extend(deferred_spans.drain(..));

        // Node pass first; the span pass reads the node buffer it writes.
        for &ni in new_nodes.iter() {
            let in_cluster = store
                .node(ni)
                .map(|n| selected.contains(&n.cluster))
                .unwrap_or(false);
            if in_cluster {
                store.set_node_visibility(ni, 1.0);
            }
        }
        for &si in new_spans.iter() {
            let Some(span) = store.span(si).copied() else {
                continue;
            };
            if !selected.contains(&span.source_cluster)
                || !selected.contains(&span.target_cluster)
            {
                continue;
            }
            if store.node_visible(span.source) && store.node_visible(span.target) {
                store.set_span_visibility(si, 1.0);
            } else {
                // released by the index but an endpoint has not surfaced yet
                deferred_spans.push(si);
            }
        }

        let visible_nodes = store
            .node_visibility_buffer()
            .iter()
            .filter(|&&v| v == 1.0)
            .count();
        self.notify(EngineNotice::YearAdvanced {
            year,
            visible_nodes,
        });

        self.playback.current_year += 1;
        if self.playback.current_year > self.playback.to_year {
            self.playback.phase = PlaybackPhase::Completed;
            self.playback.abort.store(true, Ordering::Relaxed);
            self.playback.cursor = None;
            self.playback.deferred_spans.clear();
            self.notify(EngineNotice::PlaybackFinished {
                stopped_early: false,
            });
            tracing::info!("playback completed");
            return StepOutcome::Finished;
        }
        StepOutcome::Continue
    }

    // Whatever was revealed at the moment of stop stays visible; there is no
    // rollback to the pre-play snapshot.
    pub fn stop_playback(&mut self) {
        if self.playback.phase != PlaybackPhase::Playing {
            return;
        }
        self.playback.phase = PlaybackPhase::Stopped;
        self.playback.abort.store(true, Ordering::Relaxed);
        self.playback.cursor = None;
        self.playback.deferred_spans.clear();
        self.notify(EngineNotice::PlaybackFinished { stopped_early: true });
        tracing::info!(year = self.playback.current_year, "playback stopped");
    }
}
