use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub type ClusterId = u32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawNode {
    pub id: String,
    pub cluster: ClusterId,
    pub year: i32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub centrality: f32,
    pub title: String,
    #[serde(default)]
    pub doi: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEdge {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub min_year: Option<i32>,
    #[serde(default)]
    pub max_year: Option<i32>,
}

impl RawEdge {
    // A single-year edge spans exactly that year on both ends.
    pub fn year_window(&self) -> Option<(i32, i32)> {
        match (self.min_year, self.max_year, self.year) {
            (Some(min), Some(max), _) => Some(if min <= max { (min, max) } else { (max, min) }),
            (Some(y), None, _) | (None, Some(y), _) | (None, None, Some(y)) => Some((y, y)),
            (None, None, None) => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    pub nodes: Vec<RawNode>,
    pub edges: Vec<RawEdge>,
    #[serde(default)]
    pub cluster_colors: HashMap<ClusterId, [f32; 3]>,
    #[serde(default)]
    pub cluster_labels: HashMap<ClusterId, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum FilterEvent {
    ClusterSelectionChanged { selected: HashSet<ClusterId> },
    YearRangeChanged { from: i32, to: i32 },
    SearchQueryExecuted { matched: HashSet<u32> },
    PlaybackStartRequested { from: i32, to: i32, selected: HashSet<ClusterId> },
    PlaybackStopRequested,
    PlaybackTickDue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum EngineNotice {
    YearAdvanced { year: i32, visible_nodes: usize },
    PlaybackFinished { stopped_early: bool },
}
