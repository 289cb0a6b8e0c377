//! # Rust-level errors
//!
//! [`GraphyError`] is for failures that cannot be expressed as a
//! [`crate::diagnostics::Diagnostics`] entry — API misuse, broken
//! preconditions, and similar programmer errors at the crate boundary.
//! Ordinary compilation failures (unknown types, asymmetric connections,
//! codegen rejections, ...) flow through `Diagnostics` instead, per
//! `spec.md` §7: "no exceptions cross the core boundary."

/// Errors raised by API misuse rather than by compiling a particular graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphyError {
    #[error("module not found: {0}")]
    ModuleNotFound(String),

    #[error("node instance not found: {0}")]
    NodeNotFound(String),

    #[error("node type not found: {module}:{name}")]
    NodeTypeNotFound { module: String, name: String },

    #[error("duplicate module path: {0}")]
    DuplicateModule(String),

    #[error("workspace not found starting from {0}")]
    WorkspaceNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Custom(String),
}

/// Result alias for fallible, non-diagnostic API operations.
pub type Result<T> = std::result::Result<T, GraphyError>;
