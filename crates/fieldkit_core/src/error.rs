//! Error types for fieldkit_core

use thiserror::Error;

use crate::reactive::Dependency;

/// Errors raised while wiring the reactive graph
///
/// These are construction errors: a derived cell or subscription that would
/// reference something outside the graph is rejected before any subscription
/// is made, so callers never observe a half-built cell.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReactiveError {
    /// A dependency handle does not refer to a live cell in this graph
    #[error("dependency {0:?} is not a live cell in this graph")]
    UnknownDependency(Dependency),

    /// A derived cell was declared without any dependency
    #[error("a derived cell needs at least one dependency")]
    EmptyDependencies,

    /// A subscription target does not refer to a live cell in this graph
    #[error("cell {0:?} is not a live cell in this graph")]
    UnknownCell(Dependency),
}

/// Result type for fieldkit_core operations
pub type Result<T> = std::result::Result<T, ReactiveError>;
