use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Unknown message type: {0}")]
    UnknownMessageKind(String),
}
