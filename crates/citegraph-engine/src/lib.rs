pub mod error;
pub mod events;
pub mod graph;
pub mod util;

pub use error::EngineError;
pub use events::EngineLoop;
pub use graph::{EngineState, GraphDataStore, PlaybackPhase, StepOutcome, TemporalIndex};
pub use util::config::EngineConfig;
