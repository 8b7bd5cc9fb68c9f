use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("pattern graph has {n} vertices, exceeds maximum of {max}")]
    PatternTooLarge { n: usize, max: usize },

    #[error("host graph has {n} vertices, exceeds maximum of {max}")]
    HostTooLarge { n: usize, max: usize },

    #[error("malformed input in {path:?}: {detail}")]
    MalformedInput { path: PathBuf, detail: String },

    #[error("internal invariant violated: {detail}")]
    InvariantViolation { detail: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
