use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Query is empty")]
    EmptyQuery,

    #[error("Collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("No retrieval path produced results")]
    RetrievalFailed,
}

pub type Result<T> = std::result::Result<T, Error>;
