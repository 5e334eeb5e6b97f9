// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use sylvan_core::{AccessType, NodeId, RequirementId};

use crate::AuthError;

/// Reason an access decision was negative.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Denial {
    /// No ACL entry of any of the principal's groups grants the access type.
    NoAclGrant(AccessType),

    /// The anonymous user may only read and download.
    Anonymous,

    /// The entity's benefactor is the trash root.
    InTrash(NodeId),

    /// The principal lacks valid approvals for these requirements.
    UnmetRequirements(Vec<RequirementId>),

    NotCertified,

    NotActMember,

    NotAllowed(String),
}

impl Display for Denial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Denial::NoAclGrant(access_type) => {
                write!(f, "you lack {access_type} access to the requested resource")
            }
            Denial::Anonymous => write!(f, "anonymous users have only READ access permission"),
            Denial::InTrash(id) => write!(f, "entity {id} is in the trash can"),
            Denial::UnmetRequirements(ids) => {
                write!(f, "there are unmet access requirements that must be met first:")?;
                for id in ids {
                    write!(f, " {id}")?;
                }
                Ok(())
            }
            Denial::NotCertified => {
                write!(f, "only certified users may create or update content")
            }
            Denial::NotActMember => {
                write!(f, "only members of the access and compliance team may do this")
            }
            Denial::NotAllowed(reason) => write!(f, "{reason}"),
        }
    }
}

/// Outcome of an access decision.
///
/// Denials are expected results, callers branch on [`AuthorizationStatus::is_authorized`] or turn
/// them into errors with [`AuthorizationStatus::check`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationStatus(Result<(), Denial>);

impl AuthorizationStatus {
    pub fn authorized() -> Self {
        Self(Ok(()))
    }

    pub fn denied(denial: Denial) -> Self {
        Self(Err(denial))
    }

    pub fn not_allowed(reason: impl Into<String>) -> Self {
        Self::denied(Denial::NotAllowed(reason.into()))
    }

    pub fn is_authorized(&self) -> bool {
        self.0.is_ok()
    }

    pub fn denial(&self) -> Option<&Denial> {
        self.0.as_ref().err()
    }

    /// Turn a denial into [`AuthError::Unauthorized`], or [`AuthError::EntityInTrash`] when the
    /// entity is in the trash can.
    pub fn check(self) -> Result<(), AuthError> {
        match self.0 {
            Ok(()) => Ok(()),
            Err(Denial::InTrash(id)) => Err(AuthError::EntityInTrash(id)),
            Err(denial) => Err(AuthError::Unauthorized(denial.to_string())),
        }
    }
}

impl From<bool> for AuthorizationStatus {
    fn from(authorized: bool) -> Self {
        if authorized {
            Self::authorized()
        } else {
            Self::not_allowed("access denied")
        }
    }
}
