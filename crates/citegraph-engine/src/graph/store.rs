use citegraph_core::{ClusterId, Dataset};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::EngineError;
use crate::util::config::EngineConfig;

// Each logical edge occupies one straight segment in the edge vertex buffer.
pub const VERTS_PER_EDGE: u32 = 2;

const DEFAULT_CLUSTER_COLOR: [f32; 3] = [0.5, 0.5, 0.5];

#[derive(Debug, Clone)]
pub struct Node {
    pub id: String,
    pub buffer_index: u32,
    pub cluster: ClusterId,
    pub year: i32,
    pub title: String,
    pub doi: Option<String>,
    pub centrality: f32,
    pub position: [f32; 3],
    pub color: [f32; 3],
}

// Half-open [start, end) range into the edge vertex buffer, plus the
// endpoint snapshot taken at build time.
#[derive(Debug, Clone, Copy)]
pub struct EdgeSpan {
    pub source: u32,
    pub target: u32,
    pub min_year: i32,
    pub max_year: i32,
    pub source_cluster: ClusterId,
    pub target_cluster: ClusterId,
    pub start: u32,
    pub end: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub nodes_loaded: usize,
    pub edges_loaded: usize,
    pub missing_endpoints: usize,
}

// One flag per published buffer; the renderer clears a flag with take_*()
// after uploading.
#[derive(Default, Debug)]
pub struct DirtyFlags {
    node_static: AtomicBool,
    node_visibility: AtomicBool,
    node_emphasis: AtomicBool,
    edge_static: AtomicBool,
    edge_visibility: AtomicBool,
}

impl DirtyFlags {
    pub(crate) fn mark_all(&self) {
        self.node_static.store(true, Ordering::Relaxed);
        self.node_visibility.store(true, Ordering::Relaxed);
        self.node_emphasis.store(true, Ordering::Relaxed);
        self.edge_static.store(true, Ordering::Relaxed);
        self.edge_visibility.store(true, Ordering::Relaxed);
    }

    pub(crate) fn mark_node_visibility(&self) {
        self.node_visibility.store(true, Ordering::Relaxed);
    }

    pub(crate) fn mark_node_emphasis(&self) {
        self.node_emphasis.store(true, Ordering::Relaxed);
    }

    pub(crate) fn mark_edge_visibility(&self) {
        self.edge_visibility.store(true, Ordering::Relaxed);
    }

    pub fn take_node_static(&self) -> bool {
        self.node_static.swap(false, Ordering::Relaxed)
    }

    pub fn take_node_visibility(&self) -> bool {
        self.node_visibility.swap(false, Ordering::Relaxed)
    }

    pub fn take_node_emphasis(&self) -> bool {
        self.node_emphasis.swap(false, Ordering::Relaxed)
    }

    pub fn take_edge_static(&self) -> bool {
        self.edge_static.swap(false, Ordering::Relaxed)
    }

    pub fn take_edge_visibility(&self) -> bool {
        self.edge_visibility.swap(false, Ordering::Relaxed)
    }
}

#[derive(Debug)]
pub struct GraphDataStore {
    nodes: Vec<Node>,
    spans: Vec<EdgeSpan>,
    index_of: HashMap<String, u32>,

    node_position: Vec<f32>,
    node_color: Vec<f32>,
    node_size: Vec<f32>,
    node_visibility: Vec<f32>,
    node_emphasis: Vec<f32>,

    edge_position: Vec<f32>,
    edge_color: Vec<f32>,
    edge_visibility: Vec<f32>,

    pub dirty: DirtyFlags,
}

impl GraphDataStore {
    pub fn load(
        dataset: &Dataset,
        cfg: &EngineConfig,
        cluster_filter: Option<&HashSet<ClusterId>>,
    ) -> Result<(Self, LoadStats), EngineError> {
        if dataset.nodes.is_empty() {
            return Err(EngineError::DataLoad("dataset has no nodes".to_string()));
        }

        let node_fraction = f64::from(cfg.node_fraction.clamp(0.0, 1.0));
        let edge_fraction = f64::from(cfg.edge_fraction.clamp(0.0, 1.0));
        let nodes_to_load = (dataset.nodes.len() as f64 * node_fraction).floor() as usize;
        let edges_to_load = (dataset.edges.len() as f64 * edge_fraction).floor() as usize;

        // Node sampling keeps input order: the loaded prefix is reproducible.
        let mut nodes: Vec<Node> = Vec::with_capacity(nodes_to_load);
        let mut index_of = HashMap::with_capacity(nodes_to_load);
        for raw in dataset.nodes.iter() {
            if nodes.len() >= nodes_to_load {
                break;
            }
            if let Some(allowed) = cluster_filter {
                if !allowed.contains(&raw.cluster) {
                    continue;
                }
            }
            let buffer_index = nodes.len() as u32;
            index_of.insert(raw.id.clone(), buffer_index);
            let color = dataset
                .cluster_colors
                .get(&raw.cluster)
                .copied()
                .unwrap_or(DEFAULT_CLUSTER_COLOR);
            nodes.push(Node {
                id: raw.id.clone(),
                buffer_index,
                cluster: raw.cluster,
                year: raw.year,
                title: raw.title.clone(),
                doi: raw.doi.clone(),
                centrality: raw.centrality,
                position: [raw.x, raw.y, raw.z],
                color,
            });
        }

        // Centrality is normalized against the loaded prefix, not the full
        // dataset.
        let mut lo = f32::INFINITY;
        let mut hi = f32::NEG_INFINITY;
        for n in nodes.iter() {
            lo = lo.min(n.centrality);
            hi = hi.max(n.centrality);
        }
        let span = hi - lo;

        let mut node_position = Vec::with_capacity(nodes.len() * 3);
        let mut node_color = Vec::with_capacity(nodes.len() * 3);
        let mut node_size = Vec::with_capacity(nodes.len());
        let mut node_visibility = Vec::with_capacity(nodes.len());
        let mut node_emphasis = Vec::with_capacity(nodes.len());
        for n in nodes.iter() {
            node_position.extend_from_slice(&n.position);
            node_color.extend_from_slice(&n.color);
            let norm = if span > 0.0 { (n.centrality - lo) / span } else { 0.0 };
            node_size.push(cfg.size_min + (cfg.size_max - cfg.size_min) * norm.powf(cfg.size_power));
            node_visibility.push(1.0);
            node_emphasis.push(0.0);
        }

        // Edge sampling is a shuffled subset; unlike nodes it is only
        // reproducible when a seed is configured.
        let mut order: Vec<usize> = (0..dataset.edges.len()).collect();
        let mut rng = match cfg.edge_shuffle_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        order.shuffle(&mut rng);
        order.truncate(edges_to_load);

        let verts = VERTS_PER_EDGE as usize;
        let mut spans: Vec<EdgeSpan> = Vec::with_capacity(edges_to_load);
        let mut edge_position = Vec::with_capacity(edges_to_load * verts * 3);
        let mut edge_color = Vec::with_capacity(edges_to_load * verts * 3);
        let mut edge_visibility = Vec::with_capacity(edges_to_load * verts);
        let mut missing_endpoints = 0usize;
        for &i in order.iter() {
            let raw = &dataset.edges[i];
            let (Some(&source), Some(&target)) =
                (index_of.get(&raw.source), index_of.get(&raw.target))
            else {
                missing_endpoints += 1;
                continue;
            };
            // An edge without its own years inherits its endpoints' years;
            // max is then the later endpoint's publication year.
            let (min_year, max_year) = match raw.year_window() {
                Some(w) => w,
                None => {
                    let a = nodes[source as usize].year;
                    let b = nodes[target as usize].year;
                    (a.min(b), a.max(b))
                }
            };
            let start = (spans.len() as u32) * VERTS_PER_EDGE;
            for &endpoint in &[source, target] {
                let n = &nodes[endpoint as usize];
                edge_position.extend_from_slice(&n.position);
                edge_color.extend_from_slice(&n.color);
                edge_visibility.push(1.0);
            }
            spans.push(EdgeSpan {
                source,
                target,
                min_year,
                max_year,
                source_cluster: nodes[source as usize].cluster,
                target_cluster: nodes[target as usize].cluster,
                start,
                end: start + VERTS_PER_EDGE,
            });
        }

        let stats = LoadStats {
            nodes_loaded: nodes.len(),
            edges_loaded: spans.len(),
            missing_endpoints,
        };
        if stats.missing_endpoints > 0 {
            tracing::warn!(
                missing = stats.missing_endpoints,
                "edges referenced nodes absent from the store"
            );
        }
        tracing::info!(
            nodes = stats.nodes_loaded,
            edges = stats.edges_loaded,
            "graph buffers populated"
        );

        let store = Self {
            nodes,
            spans,
            index_of,
            node_position,
            node_color,
            node_size,
            node_visibility,
            node_emphasis,
            edge_position,
            edge_color,
            edge_visibility,
            dirty: DirtyFlags::default(),
        };
        store.dirty.mark_all();
        Ok((store, stats))
    }

    pub fn node(&self, buffer_index: u32) -> Option<&Node> {
        self.nodes.get(buffer_index as usize)
    }

    pub fn node_by_id(&self, id: &str) -> Option<&Node> {
        self.index_of.get(id).and_then(|&i| self.node(i))
    }

    pub fn span(&self, span_index: u32) -> Option<&EdgeSpan> {
        self.spans.get(span_index as usize)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn spans(&self) -> &[EdgeSpan] {
        &self.spans
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn span_count(&self) -> usize {
        self.spans.len()
    }

    // ----- Renderer-facing buffers (read-only) -----
    pub fn node_position_buffer(&self) -> &[f32] {
        &self.node_position
    }

    pub fn node_color_buffer(&self) -> &[f32] {
        &self.node_color
    }

    pub fn node_size_buffer(&self) -> &[f32] {
        &self.node_size
    }

    pub fn node_visibility_buffer(&self) -> &[f32] {
        &self.node_visibility
    }

    pub fn node_emphasis_buffer(&self) -> &[f32] {
        &self.node_emphasis
    }

    pub fn edge_position_buffer(&self) -> &[f32] {
        &self.edge_position
    }

    pub fn edge_color_buffer(&self) -> &[f32] {
        &self.edge_color
    }

    pub fn edge_visibility_buffer(&self) -> &[f32] {
        &self.edge_visibility
    }

    // ----- Engine-internal visibility writes -----
    pub(crate) fn node_visible(&self, buffer_index: u32) -> bool {
        self.node_visibility
            .get(buffer_index as usize)
            .map(|&v| v == 1.0)
            .unwrap_or(false)
    }

    pub(crate) fn set_node_visibility(&mut self, buffer_index: u32, value: f32) {
        if let Some(slot) = self.node_visibility.get_mut(buffer_index as usize) {
            *slot = value;
        }
        self.dirty.mark_node_visibility();
    }

    pub(crate) fn fill_node_visibility(&mut self, value: f32) {
        self.node_visibility.fill(value);
        self.dirty.mark_node_visibility();
    }

    pub(crate) fn set_span_visibility(&mut self, span_index: u32, value: f32) {
        let Some(span) = self.spans.get(span_index as usize).copied() else {
            return;
        };
        for v in &mut self.edge_visibility[span.start as usize..span.end as usize] {
            *v = value;
        }
        self.dirty.mark_edge_visibility();
    }

    pub(crate) fn fill_span_visibility(&mut self, value: f32) {
        self.edge_visibility.fill(value);
        self.dirty.mark_edge_visibility();
    }

    pub(crate) fn apply_node_visibility(&mut self, rule: impl Fn(&Node) -> bool) {
        for (i, node) in self.nodes.iter().enumerate() {
            self.node_visibility[i] = if rule(node) { 1.0 } else { 0.0 };
        }
        self.dirty.mark_node_visibility();
    }

    // The rule sees the node visibility buffer as written by the node pass.
    pub(crate) fn apply_span_visibility(&mut self, rule: impl Fn(&EdgeSpan, &[f32]) -> bool) {
        for span in self.spans.iter() {
            let vis = if rule(span, &self.node_visibility) { 1.0 } else { 0.0 };
            for v in &mut self.edge_visibility[span.start as usize..span.end as usize] {
                *v = vis;
            }
        }
        self.dirty.mark_edge_visibility();
    }

    pub(crate) fn set_node_emphasis(&mut self, buffer_index: u32, value: f32) {
        if let Some(slot) = self.node_emphasis.get_mut(buffer_index as usize) {
            *slot = value;
        }
        self.dirty.mark_node_emphasis();
    }

    pub(crate) fn fill_node_emphasis(&mut self, value: f32) {
        self.node_emphasis.fill(value);
        self.dirty.mark_node_emphasis();
    }
}
