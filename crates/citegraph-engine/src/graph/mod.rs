pub mod playback;
pub mod state;
pub mod store;
pub mod temporal;
pub mod visibility;

pub use playback::StepOutcome;
pub use state::{EngineState, MaskState, PlaybackPhase, PlaybackState};
pub use store::{EdgeSpan, GraphDataStore, LoadStats, Node, VERTS_PER_EDGE};
pub use temporal::{TemporalCursor, TemporalIndex};
