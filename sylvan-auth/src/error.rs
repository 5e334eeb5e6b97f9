// SPDX-License-Identifier: MIT OR Apache-2.0

use sylvan_core::{Etag, ModelError, NodeId};
use sylvan_store::StoreError;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The node does not own an ACL, it is governed by the ACL of its benefactor.
    #[error("{node_id} inherits its permissions from {benefactor_id}")]
    AclInheritance {
        node_id: NodeId,
        benefactor_id: NodeId,
    },

    #[error("conflicting update of {id}: expected etag {expected} but found {actual}")]
    ConflictingUpdate {
        id: String,
        expected: Etag,
        actual: Etag,
    },

    #[error("invalid model: {0}")]
    InvalidModel(String),

    #[error("illegal argument: {0}")]
    IllegalArgument(String),

    #[error("{0} is in the trash can")]
    EntityInTrash(NodeId),
}

impl From<StoreError> for AuthError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(what) => AuthError::NotFound(what),
            StoreError::ConflictingUpdate {
                id,
                expected,
                actual,
            } => AuthError::ConflictingUpdate {
                id,
                expected,
                actual,
            },
            StoreError::AlreadyExists(_) | StoreError::Cycle { .. } => {
                AuthError::IllegalArgument(error.to_string())
            }
        }
    }
}

impl From<ModelError> for AuthError {
    fn from(error: ModelError) -> Self {
        match error {
            ModelError::MissingPrincipal(_)
            | ModelError::DuplicatePrincipal(_, _)
            | ModelError::InvalidAclOwner(_) => AuthError::InvalidModel(error.to_string()),
            ModelError::InvalidId(_)
            | ModelError::UnknownObjectType(_)
            | ModelError::UnknownAccessType(_)
            | ModelError::UnknownEntityType(_) => AuthError::IllegalArgument(error.to_string()),
        }
    }
}
