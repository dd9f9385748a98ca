use citegraph_core::ClusterId;
use std::collections::HashSet;

use crate::error::EngineError;
use crate::graph::state::{EngineState, PlaybackPhase};

impl EngineState {
    // ----- Mask setters -----
    pub fn set_cluster_mask(&mut self, selected: &HashSet<ClusterId>) -> Result<(), EngineError> {
        let store = self.store.as_ref().ok_or(EngineError::NotInitialized)?;
        for node in store.nodes() {
            self.masks.cluster[node.buffer_index as usize] =
                u8::from(selected.contains(&node.cluster));
        }
        self.recompute_unless_playing();
        Ok(())
    }

    pub fn set_year_mask(&mut self, from: i32, to: i32) -> Result<(), EngineError> {
        let store = self.store.as_ref().ok_or(EngineError::NotInitialized)?;
        // Inverted ranges are swapped, never rejected.
        let (from, to) = if from <= to { (from, to) } else { (to, from) };
        for node in store.nodes() {
            self.masks.year[node.buffer_index as usize] =
                u8::from(from <= node.year && node.year <= to);
        }
        self.masks.year_range = Some((from, to));
        self.recompute_unless_playing();
        Ok(())
    }

    // Search marks the emphasis buffer only; it never hides anything and is
    // independent of the running playback.
    pub fn set_search_highlight(&mut self, matched: &HashSet<u32>) -> Result<(), EngineError> {
        let store = self.store.as_mut().ok_or(EngineError::NotInitialized)?;
        store.fill_node_emphasis(0.0);
        for &i in matched {
            store.set_node_emphasis(i, 1.0);
        }
        Ok(())
    }

    // Playback owns the visibility buffers while a reveal is running; mask
    // edits made meanwhile apply at the next recompute after it ends.
    fn recompute_unless_playing(&mut self) {
        if self.playback.phase != PlaybackPhase::Playing {
            self.recompute();
        }
    }

    // ----- Combined visibility -----
    pub fn recompute(&mut self) {
        let Some(store) = self.store.as_mut() else {
            return;
        };
        let masks = &self.masks;

        // Node pass strictly before the edge pass: spans read the node
        // visibility written here.
        store.apply_node_visibility(|node| {
            let i = node.buffer_index as usize;
            masks.cluster[i] * masks.year[i] * masks.search[i] == 1
        });

        let year_range = masks.year_range;
        store.apply_span_visibility(|span, node_vis| {
            let endpoints_visible = node_vis[span.source as usize] == 1.0
                && node_vis[span.target as usize] == 1.0;
            let years_ok = match year_range {
                None => true,
                Some((from, to)) => from <= span.min_year && span.max_year <= to,
            };
            endpoints_visible && years_ok
        });

        let visible = store
            .node_visibility_buffer()
            .iter()
            .filter(|&&v| v == 1.0)
            .count();
        if visible > self.cfg.max_visible_nodes_warning_threshold {
            tracing::warn!(
                visible,
                threshold = self.cfg.max_visible_nodes_warning_threshold,
                "visible node count exceeds warning threshold"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::state::fixtures::five_node_dataset;
    use crate::util::config::EngineConfig;

    fn loaded_state() -> EngineState {
        let cfg = EngineConfig {
            start_year: 2000,
            end_year: 2020,
            edge_shuffle_seed: Some(5),
            ..EngineConfig::default()
        };
        let mut st = EngineState::new(cfg);
        st.load_dataset(&five_node_dataset(), None)
            .expect("load dataset");
        st
    }

    fn clusters(ids: &[ClusterId]) -> HashSet<ClusterId> {
        ids.iter().copied().collect()
    }

    fn visible_nodes(st: &EngineState) -> Vec<u32> {
        st.store
            .as_ref()
            .expect("store")
            .node_visibility_buffer()
            .iter()
            .enumerate()
            .filter(|(_, &v)| v == 1.0)
            .map(|(i, _)| i as u32)
            .collect()
    }

    fn span_visible(st: &EngineState, source: u32, target: u32) -> bool {
        let store = st.store.as_ref().expect("store");
        let span = store
            .spans()
            .iter()
            .find(|s| (s.source, s.target) == (source, target))
            .expect("span");
        store.edge_visibility_buffer()[span.start as usize] == 1.0
    }

    #[test]
    fn setters_before_load_are_rejected() {
        let mut st = EngineState::default();
        let err = st.set_cluster_mask(&clusters(&[0])).unwrap_err();
        assert!(matches!(err, EngineError::NotInitialized));
        let err = st.set_year_mask(2000, 2010).unwrap_err();
        assert!(matches!(err, EngineError::NotInitialized));
        let err = st.set_search_highlight(&HashSet::new()).unwrap_err();
        assert!(matches!(err, EngineError::NotInitialized));
    }

    #[test]
    fn combined_visibility_is_the_mask_product() {
        let mut st = loaded_state();
        st.set_cluster_mask(&clusters(&[0, 1])).expect("clusters");
        st.set_year_mask(2000, 2020).expect("years");
        let store = st.store.as_ref().expect("store");
        for node in store.nodes() {
            let i = node.buffer_index as usize;
            let expected =
                f32::from(st.masks.cluster[i] * st.masks.year[i] * st.masks.search[i]);
            assert_eq!(store.node_visibility_buffer()[i], expected);
        }
    }

    #[test]
    fn cluster_and_year_masks_compose() {
        let mut st = loaded_state();
        // cluster 0 = {n0, n2}; years [2000, 2012] keep n0 (2000) and n2 (2010)
        st.set_cluster_mask(&clusters(&[0])).expect("clusters");
        st.set_year_mask(2000, 2012).expect("years");
        assert_eq!(visible_nodes(&st), vec![0, 2]);

        // narrowing to [2000, 2005] drops n2
        st.set_year_mask(2000, 2005).expect("years");
        assert_eq!(visible_nodes(&st), vec![0]);
    }

    #[test]
    fn inverted_year_range_is_swapped() {
        let mut st = loaded_state();
        st.set_cluster_mask(&clusters(&[0])).expect("clusters");
        st.set_year_mask(2012, 2000).expect("years");
        assert_eq!(visible_nodes(&st), vec![0, 2]);
        assert_eq!(st.masks.year_range, Some((2000, 2012)));
    }

    #[test]
    fn edges_require_both_endpoints_visible() {
        let mut st = loaded_state();
        st.set_cluster_mask(&clusters(&[0, 1])).expect("clusters");
        st.set_year_mask(2000, 2020).expect("years");
        assert!(span_visible(&st, 0, 4));

        // only cluster 0 selected: n4 drops out of the combined set
        st.set_cluster_mask(&clusters(&[0])).expect("clusters");
        assert!(!span_visible(&st, 0, 4));

        let store = st.store.as_ref().expect("store");
        for span in store.spans() {
            let vis = store.edge_visibility_buffer()[span.start as usize];
            if vis == 1.0 {
                assert_eq!(store.node_visibility_buffer()[span.source as usize], 1.0);
                assert_eq!(store.node_visibility_buffer()[span.target as usize], 1.0);
            }
        }
    }

    #[test]
    fn edge_year_window_must_fit_the_filter_range() {
        let mut st = loaded_state();
        st.set_cluster_mask(&clusters(&[0, 1])).expect("clusters");
        // n0--n4 spans 2005..2015 and both endpoints stay visible under the
        // full range
        st.set_year_mask(2000, 2020).expect("years");
        assert!(span_visible(&st, 0, 4));

        // 2015 now exceeds the upper bound even though n0 stays visible
        st.set_year_mask(2000, 2010).expect("years");
        assert!(!span_visible(&st, 0, 4));
    }

    #[test]
    fn search_highlight_marks_emphasis_without_hiding() {
        let mut st = loaded_state();
        st.set_cluster_mask(&clusters(&[0, 1])).expect("clusters");
        let before = visible_nodes(&st);
        st.set_search_highlight(&[1u32, 3].into_iter().collect())
            .expect("search");
        assert_eq!(visible_nodes(&st), before);
        let store = st.store.as_ref().expect("store");
        assert_eq!(store.node_emphasis_buffer(), &[0.0, 1.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn recompute_is_idempotent() {
        let mut st = loaded_state();
        st.set_cluster_mask(&clusters(&[1])).expect("clusters");
        st.set_year_mask(2004, 2016).expect("years");
        let store = st.store.as_ref().expect("store");
        let nodes_before = store.node_visibility_buffer().to_vec();
        let edges_before = store.edge_visibility_buffer().to_vec();

        st.recompute();

        let store = st.store.as_ref().expect("store");
        assert_eq!(store.node_visibility_buffer(), nodes_before.as_slice());
        assert_eq!(store.edge_visibility_buffer(), edges_before.as_slice());
    }

    #[test]
    fn recompute_marks_buffers_dirty_for_the_renderer() {
        let mut st = loaded_state();
        let store = st.store.as_ref().expect("store");
        // consume the load-time dirty state
        while store.dirty.take_node_visibility() {}
        while store.dirty.take_edge_visibility() {}

        st.set_year_mask(2000, 2010).expect("years");

        let store = st.store.as_ref().expect("store");
        assert!(store.dirty.take_node_visibility());
        assert!(store.dirty.take_edge_visibility());
        assert!(!store.dirty.take_node_visibility(), "flag must clear on take");
    }
}
