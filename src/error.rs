use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `slawarden`.
///
/// Each subsystem defines its own error variant. The engine matches on these
/// to decide whether a failure degrades one check, one sink, or nothing at
/// all; plumbing code (CLI, config loading, server startup) continues to use
/// `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum SlaError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Metric registry ─────────────────────────────────────────────────
    #[error("registry: {0}")]
    Registry(#[from] RegistryError),

    // ── Metric sources ──────────────────────────────────────────────────
    #[error("source: {0}")]
    Source(#[from] SourceError),

    // ── Durable state ───────────────────────────────────────────────────
    #[error("persistence: {0}")]
    Persistence(#[from] PersistenceError),

    // ── Event bus ───────────────────────────────────────────────────────
    #[error("publish: {0}")]
    Publish(#[from] PublishError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Registry errors ─────────────────────────────────────────────────────────

/// Lifecycle and lookup failures on the metric registry.
///
/// `AlreadyRemoved` and `NeverRemoved` are informative no-ops: operator
/// surfaces report them as messages, not as hard failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("metric {0} does not exist")]
    NotFound(String),

    #[error("metric {0} is already removed")]
    AlreadyRemoved(String),

    #[error("metric {0} was not previously removed")]
    NeverRemoved(String),

    #[error("metric {name} is {actual}, value update expected {expected}")]
    KindMismatch {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },
}

impl RegistryError {
    /// True for outcomes that leave the registry unchanged and should be
    /// reported as information rather than failure.
    pub fn is_informative(&self) -> bool {
        matches!(self, Self::AlreadyRemoved(_) | Self::NeverRemoved(_))
    }
}

// ─── Source errors ───────────────────────────────────────────────────────────

/// A metric source could not produce a value this cycle.
///
/// Every variant means "unavailable": the affected checks are skipped for
/// the cycle and the previous registry value stays in place.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("source {metric} unavailable: HTTP {status}")]
    Status { metric: String, status: u16 },

    #[error("source {metric} unavailable: no response within {after_ms}ms")]
    Timeout { metric: String, after_ms: u64 },

    #[error("source {metric} unavailable: request failed: {message}")]
    Request { metric: String, message: String },

    #[error("source {metric} unavailable: malformed payload: {message}")]
    Malformed { metric: String, message: String },
}

impl SourceError {
    pub fn metric(&self) -> &str {
        match self {
            Self::Status { metric, .. }
            | Self::Timeout { metric, .. }
            | Self::Request { metric, .. }
            | Self::Malformed { metric, .. } => metric,
        }
    }
}

// ─── Persistence errors ──────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("open state store: {0}")]
    Open(String),

    #[error("write state: {0}")]
    Write(String),

    #[error("read state: {0}")]
    Read(String),
}

// ─── Publish errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("bus transport failed: {0}")]
    Transport(String),

    #[error("bus rejected event on topic {topic}: HTTP {status}")]
    Rejected { topic: String, status: u16 },

    #[error("encode failed: {0}")]
    Encode(String),
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, SlaError>;
