use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Where a failure happened: while loading artifacts (fatal) or while
/// serving one request (isolated to that request).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Artifact,
    Request,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::Artifact => "artifact",
            FailureStage::Request => "request",
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Artifact missing: {0}")]
    ArtifactMissing(String),

    #[error("Artifact corrupt: {0}")]
    ArtifactCorrupt(String),

    #[error("Artifact dimension mismatch in {artifact}: expected {expected}, got {actual}")]
    ArtifactDimensionMismatch {
        artifact: String,
        expected: usize,
        actual: usize,
    },

    #[error("Candidate retrieval failed: {0}")]
    RetrievalFailure(String),

    #[error("Unexpected failure: {0}")]
    UnexpectedFailure(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn stage(&self) -> FailureStage {
        match self {
            Error::ArtifactMissing(_)
            | Error::ArtifactCorrupt(_)
            | Error::ArtifactDimensionMismatch { .. }
            | Error::InvalidConfig(_)
            | Error::Io(_) => FailureStage::Artifact,
            Error::RetrievalFailure(_) | Error::UnexpectedFailure(_) => FailureStage::Request,
        }
    }

    /// Artifact faults are only ever raised during startup.
    pub fn is_fatal(&self) -> bool {
        self.stage() == FailureStage::Artifact
    }
}
