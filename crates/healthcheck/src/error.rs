//! Registration-time errors.
//!
//! Run-time probe faults are not errors at this level; see
//! [`crate::executor`].

use crate::types::Category;
use thiserror::Error;

/// Errors returned by the registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("probe '{name}' is already registered under {category}")]
    DuplicateName { name: String, category: Category },

    #[error("probe name must not be empty")]
    InvalidName,

    #[error("unknown health category '{0}'")]
    UnknownCategory(String),
}

impl From<RegistryError> for common::Error {
    fn from(err: RegistryError) -> Self {
        common::Error::registry(err)
    }
}
