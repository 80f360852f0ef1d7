use thiserror::Error;

/// Typed failures of the canonicalization core.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The URL does not reduce to `https://github.com/<org>/<repo>`.
    #[error("not canonicalizable as a GitHub repository: {0:?}")]
    NotCanonicalizable(String),
}
