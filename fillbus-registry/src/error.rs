//! Registry error types.

use crate::tag::TagType;
use thiserror::Error;

/// Errors from registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("no tag registered with id {0}")]
    NotFound(u16),

    #[error("value type {got} does not match tag type {expected}")]
    InvalidValue { expected: TagType, got: TagType },
}
