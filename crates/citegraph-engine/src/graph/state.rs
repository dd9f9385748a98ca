use citegraph_core::{ClusterId, Dataset, EngineNotice};
use crossbeam_channel::Sender;
use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::error::EngineError;
use crate::graph::store::{GraphDataStore, LoadStats};
use crate::graph::temporal::{TemporalCursor, TemporalIndex};
use crate::util::config::EngineConfig;

// One {0,1} entry per node, aligned with buffer_index. The combined node
// visibility is the product of the three masks.
#[derive(Default)]
pub struct MaskState {
    pub cluster: Vec<u8>,
    pub year: Vec<u8>,
    pub search: Vec<u8>,
    pub year_range: Option<(i32, i32)>,
}

impl MaskState {
    fn reset(&mut self, len: usize) {
        self.cluster = vec![1; len];
        self.year = vec![1; len];
        self.search = vec![1; len];
        self.year_range = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackPhase {
    #[default]
    Idle,
    Playing,
    Stopped,
    Completed,
}

pub struct PlaybackState {
    pub phase: PlaybackPhase,
    pub current_year: i32,
    pub to_year: i32,
    pub selected: HashSet<ClusterId>,
    pub(crate) cursor: Option<TemporalCursor>,
    // Spans released by the index whose endpoints are not yet revealed;
    // retried on every tick until the endpoints appear.
    pub(crate) deferred_spans: Vec<u32>,
    pub abort: Arc<AtomicBool>,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            phase: PlaybackPhase::Idle,
            current_year: 0,
            to_year: 0,
            selected: HashSet::new(),
            cursor: None,
            deferred_spans: Vec::new(),
            abort: Arc::new(AtomicBool::new(false)),
        }
    }
}

pub struct EngineState {
    pub store: Option<GraphDataStore>,
    pub temporal: Option<TemporalIndex>,
    pub masks: MaskState,
    pub playback: PlaybackState,
    pub cfg: EngineConfig,
    pub stats: LoadStats,
    notices: Option<Sender<EngineNotice>>,
}

impl Default for EngineState {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl EngineState {
    pub fn new(cfg: EngineConfig) -> Self {
        Self {
            store: None,
            temporal: None,
            masks: MaskState::default(),
            playback: PlaybackState::default(),
            cfg,
            stats: LoadStats::default(),
            notices: None,
        }
    }

    // Year-advance and completion notices are published here; payloads are
    // typed, there is no ambient event bus.
    pub fn subscribe(&mut self, tx: Sender<EngineNotice>) {
        self.notices = Some(tx);
    }

    pub fn load_dataset(
        &mut self,
        dataset: &Dataset,
        cluster_filter: Option<&HashSet<ClusterId>>,
    ) -> Result<LoadStats, EngineError> {
        // Build everything before touching self so a failed load leaves the
        // previous state untouched.
        let (store, stats) = GraphDataStore::load(dataset, &self.cfg, cluster_filter)?;
        let (start_year, end_year) = self.cfg.year_span();
        let temporal = TemporalIndex::build(&store, start_year, end_year);

        self.masks.reset(store.node_count());
        self.playback = PlaybackState::default();
        self.stats = stats;
        self.store = Some(store);
        self.temporal = Some(temporal);
        Ok(stats)
    }

    pub fn clear(&mut self) {
        self.store = None;
        self.temporal = None;
        self.masks = MaskState::default();
        self.playback = PlaybackState::default();
        self.stats = LoadStats::default();
    }

    pub(crate) fn notify(&self, notice: EngineNotice) {
        if let Some(tx) = &self.notices {
            let _ = tx.send(notice);
        }
    }
}
