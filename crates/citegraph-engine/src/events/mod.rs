pub mod pacer;
pub mod protocol;

pub use pacer::spawn_pacer;
pub use protocol::{drain_events, EngineLoop};
