//! Crate-wide error type.
//!
//! One enum carries every failure kind named in the engine's error design:
//! patch/diff parsing failures, forge adapter inconsistencies, and sandbox
//! execution failures all surface through `EngineError` so callers match on
//! a single type regardless of which component raised it.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Unified-diff text was malformed (bad hunk header, unparsable body).
    #[error("invalid patch: {0}")]
    InvalidPatch(String),

    /// A structured configuration file (JSON/JSON5/YAML/TOML) failed to parse.
    #[error("failed to parse {path} as {format}: {source}")]
    ParseFailure {
        path: String,
        format: &'static str,
        source: String,
    },

    /// A forge reported a file status verb the adapter doesn't recognize.
    #[error("unknown file status {status:?} for {path}")]
    UnknownFileStatus { path: String, status: String },

    /// The forge's response was internally inconsistent (e.g. a rename
    /// without a `previous_filename`).
    #[error("inconsistent forge response: {0}")]
    InconsistentForgeResponse(String),

    /// A `fensak` front-matter key was present but structurally invalid.
    #[error("malformed front matter: {0}")]
    MalformedFrontMatter(String),

    /// The rule's `main` returned something other than a boolean.
    #[error("rule main() returned a non-boolean result: {0}")]
    NonBooleanResult(String),

    /// The guest program threw, or referenced a name that isn't bound.
    #[error("rule execution failed: {0}")]
    RuleExecutionFailure(String),

    /// The interpreter exceeded `max_runtime_ms`.
    #[error("rule execution timed out after {0}ms")]
    Timeout(u64),

    /// A harness invariant was violated — not the guest's fault.
    #[error("engine internal error: {0}")]
    EngineInternalError(String),

    /// Transport-level failure talking to a forge. Not one of the spec's
    /// named kinds — the spec treats forge I/O as already-succeeded input
    /// to the adapters, but a real adapter has to surface it somehow.
    #[error("forge request failed: {0}")]
    Forge(#[from] reqwest::Error),

    /// Local file I/O failure (CLI binary reading fixtures from disk).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
