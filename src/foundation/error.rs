use std::fmt;

/// Convenience result type used across the crate.
pub type StyleCacheResult<T> = Result<T, StyleCacheError>;

/// One rejected action line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineError {
    /// 1-based line number in the submitted action text.
    pub line: usize,
    /// Human readable reason.
    pub reason: String,
}

/// Every rejected line of one action list, reported as a batch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InvalidActions {
    errors: Vec<LineError>,
}

impl InvalidActions {
    pub(crate) fn push(&mut self, line: usize, reason: impl Into<String>) {
        self.errors.push(LineError {
            line,
            reason: reason.into(),
        });
    }

    /// Returns `true` when no line was rejected.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// 1-based numbers of the rejected lines, ascending.
    pub fn lines(&self) -> Vec<usize> {
        self.errors.iter().map(|e| e.line).collect()
    }

    /// Per-line details.
    pub fn errors(&self) -> &[LineError] {
        &self.errors
    }
}

impl fmt::Display for InvalidActions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines = self
            .lines()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "error on lines {lines}")
    }
}

/// Crate-wide error taxonomy.
#[derive(thiserror::Error, Debug)]
pub enum StyleCacheError {
    /// One or more action lines failed to parse or validate.
    #[error("validation error: {0}")]
    InvalidActions(InvalidActions),

    /// Any other malformed input (config, style document, empty action list).
    #[error("validation error: {0}")]
    Validation(String),

    /// The requested resource does not exist or cannot be produced.
    #[error("not found: {0}")]
    NotFound(String),

    /// A pixel primitive failed while applying a style.
    #[error("transform error: action '{kind}' at order {order}: {message}")]
    Transform {
        /// Canonical action kind name.
        kind: String,
        /// Order of the failing action within its style.
        order: usize,
        /// Primitive failure description.
        message: String,
    },

    /// The derived artifact could not be written to the cache.
    #[error("persist error: {0}")]
    Persist(String),

    /// A JSON document could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Raw filesystem failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StyleCacheError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn persist(msg: impl Into<String>) -> Self {
        Self::Persist(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    pub fn transform(kind: impl Into<String>, order: usize, message: impl Into<String>) -> Self {
        Self::Transform {
            kind: kind.into(),
            order,
            message: message.into(),
        }
    }

    /// Rejected line numbers when this is a batch validation failure.
    pub fn invalid_lines(&self) -> Option<Vec<usize>> {
        match self {
            Self::InvalidActions(inv) => Some(inv.lines()),
            _ => None,
        }
    }
}

impl From<InvalidActions> for StyleCacheError {
    fn from(value: InvalidActions) -> Self {
        Self::InvalidActions(value)
    }
}
