use crate::graph::store::GraphDataStore;

// Year-bucketed index over a fixed [start_year, end_year] window. Built once
// after load, read-only afterwards. Nodes bucket by publication year, edge
// spans by the year they may first appear (min_year).
pub struct TemporalIndex {
    start_year: i32,
    end_year: i32,
    node_buckets: Vec<Vec<u32>>,
    span_buckets: Vec<Vec<u32>>,
}

impl TemporalIndex {
    pub fn build(store: &GraphDataStore, start_year: i32, end_year: i32) -> Self {
        let (start_year, end_year) = if start_year <= end_year {
            (start_year, end_year)
        } else {
            (end_year, start_year)
        };
        let len = (end_year - start_year + 1) as usize;
        let mut node_buckets = vec![Vec::new(); len];
        let mut span_buckets = vec![Vec::new(); len];

        for node in store.nodes() {
            if node.year < start_year || node.year > end_year {
                continue;
            }
            node_buckets[(node.year - start_year) as usize].push(node.buffer_index);
        }
        for (i, span) in store.spans().iter().enumerate() {
            if span.min_year < start_year || span.min_year > end_year {
                continue;
            }
            // A span whose later endpoint falls past the window can never be
            // revealed within it.
            if span.max_year > end_year {
                continue;
            }
            span_buckets[(span.min_year - start_year) as usize].push(i as u32);
        }

        Self {
            start_year,
            end_year,
            node_buckets,
            span_buckets,
        }
    }

    pub fn year_span(&self) -> (i32, i32) {
        (self.start_year, self.end_year)
    }

    fn upper_bucket(&self, year: i32) -> usize {
        if year < self.start_year {
            0
        } else {
            (year.min(self.end_year) - self.start_year + 1) as usize
        }
    }

    pub fn nodes_up_to(&self, year: i32) -> impl Iterator<Item = u32> + '_ {
        self.node_buckets[..self.upper_bucket(year)]
            .iter()
            .flat_map(|bucket| bucket.iter().copied())
    }

    // A span counts as revealed only once both its min_year bucket has been
    // reached and its max_year does not exceed the target year.
    pub fn edges_up_to<'a>(
        &'a self,
        store: &'a GraphDataStore,
        year: i32,
    ) -> impl Iterator<Item = u32> + 'a {
        self.span_buckets[..self.upper_bucket(year)]
            .iter()
            .flat_map(|bucket| bucket.iter().copied())
            .filter(move |&i| {
                store
                    .span(i)
                    .map(|s| s.max_year <= year)
                    .unwrap_or(false)
            })
    }
}

// Incremental accumulator for sequential playback: each advance_to() yields
// only the elements newly revealed since the previous call, so a playback
// tick touches one bucket instead of rescanning the dataset.
pub struct TemporalCursor {
    next_year: i32,
    pending_spans: Vec<u32>,
}

impl TemporalCursor {
    pub fn new(index: &TemporalIndex) -> Self {
        Self {
            next_year: index.start_year,
            pending_spans: Vec::new(),
        }
    }

    pub fn advance_to(
        &mut self,
        index: &TemporalIndex,
        store: &GraphDataStore,
        year: i32,
        new_nodes: &mut Vec<u32>,
        new_spans: &mut Vec<u32>,
    ) {
        let target = year.min(index.end_year);
        while self.next_year <= target {
            let bucket = (self.next_year - index.start_year) as usize;
            new_nodes.extend_from_slice(&index.node_buckets[bucket]);
            self.pending_spans
                .extend_from_slice(&index.span_buckets[bucket]);
            self.next_year += 1;
        }

        // Release spans whose later endpoint year has arrived.
        let mut i = 0;
        while i < self.pending_spans.len() {
            let si = self.pending_spans[i];
            let released = store.span(si).map(|s| s.max_year <= year).unwrap_or(true);
            if released {
                self.pending_spans.swap_remove(i);
                if store.span(si).is_some() {
                    new_spans.push(si);
                }
            } else {
                i += 1;
            }
        }
    }
}
