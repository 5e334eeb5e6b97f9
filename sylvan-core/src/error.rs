// SPDX-License-Identifier: MIT OR Apache-2.0

use thiserror::Error;

/// Errors raised while parsing or validating data types.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid identifier \"{0}\"")]
    InvalidId(String),

    #[error("unknown object type \"{0}\"")]
    UnknownObjectType(String),

    #[error("unknown access type \"{0}\"")]
    UnknownAccessType(String),

    #[error("unknown entity type \"{0}\"")]
    UnknownEntityType(String),

    #[error("access control list of {0} contains an entry without a principal")]
    MissingPrincipal(String),

    #[error("access control list of {0} contains more than one entry for principal {1}")]
    DuplicatePrincipal(String, u64),

    #[error("{0} can not own an access control list")]
    InvalidAclOwner(String),
}
