use thiserror::Error;

/// Canonical result for core and planner.
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure a plan build can surface.
///
/// All variants are terminal for the statement being built; the build
/// session records the first one and replays it to every later caller, so
/// the type is `Clone`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("Unsupported construct: {0}")]
    UnsupportedConstruct(String),

    #[error("The used SELECT statements have a different number of columns: expected {expected}, found {found}")]
    ArityMismatch { expected: usize, found: usize },

    #[error("Column error: {0}")]
    AmbiguousOrMissingColumn(String),

    #[error("Aggregate extraction failed: {0}")]
    ExtractionFailure(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Hashing error: {0}")]
    Hash(String),
}

impl Error {
    /// Short stable name of the error class, handy for logs and test asserts.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::UnsupportedConstruct(_) => "UnsupportedConstruct",
            Error::ArityMismatch { .. } => "ArityMismatch",
            Error::AmbiguousOrMissingColumn(_) => "AmbiguousOrMissingColumn",
            Error::ExtractionFailure(_) => "ExtractionFailure",
            Error::Catalog(_) => "Catalog",
            Error::Config(_) => "Config",
            Error::Hash(_) => "Hash",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Hash(e.to_string())
    }
}
