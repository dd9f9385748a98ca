use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("dataset cannot be loaded: {0}")]
    DataLoad(String),

    #[error("graph data is not loaded")]
    NotInitialized,

    #[error("playback requires at least one selected cluster")]
    NoSelection,
}
