//! Error type for heap construction

use crate::ident::Ident;
use thiserror::Error;

/// Error raised when building an ill-formed piece of symbolic heap.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeapError {
    /// A list-segment parameter must describe at least one cell.
    #[error("list-segment parameter has an empty body")]
    EmptyParaBody,
    /// Formal parameters of a list segment must be pairwise distinct.
    #[error("duplicate formal parameter {0} in a list-segment parameter")]
    DuplicateFormal(Ident),
}

/// Result type for heap construction.
pub type Result<T> = std::result::Result<T, HeapError>;
