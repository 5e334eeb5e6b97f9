// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt::Display;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{AccessType, Etag, EvaluationId, NodeId, PrincipalId, RequirementId, Timestamp};

/// Object an access requirement can be attached to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RestrictableObject {
    /// Restricts the entity and all of its descendants.
    Entity(NodeId),
    Evaluation(EvaluationId),
    Team(PrincipalId),
}

impl Display for RestrictableObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RestrictableObject::Entity(id) => write!(f, "ENTITY {id}"),
            RestrictableObject::Evaluation(id) => write!(f, "EVALUATION {id}"),
            RestrictableObject::Team(id) => write!(f, "TEAM {id}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequirementKind {
    /// Accepted by the accessor themselves.
    TermsOfUse,

    /// Approved by the ACT after reviewing a data access request. Approvals expire after the
    /// given period when one is set.
    Managed { expiration_period: Option<Duration> },

    /// Blocks access until the ACT lifts it, approvals can not be created.
    Lock,
}

/// Condition gating one access type on a set of subjects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequirement {
    pub id: RequirementId,
    pub name: String,
    pub kind: RequirementKind,
    pub subjects: Vec<RestrictableObject>,
    pub access_type: AccessType,

    /// Incremented on every update. Approvals are granted for one version.
    pub version: u64,

    pub created_by: PrincipalId,
    pub modified_on: Timestamp,
    pub etag: Etag,
}

impl AccessRequirement {
    pub fn new(
        id: RequirementId,
        kind: RequirementKind,
        subjects: impl IntoIterator<Item = RestrictableObject>,
        created_by: PrincipalId,
    ) -> Self {
        Self {
            id,
            name: format!("requirement {id}"),
            kind,
            subjects: subjects.into_iter().collect(),
            access_type: AccessType::Download,
            version: 0,
            created_by,
            modified_on: Timestamp::now(),
            etag: Etag::default(),
        }
    }

    pub fn with_access_type(mut self, access_type: AccessType) -> Self {
        self.access_type = access_type;
        self
    }

    pub fn is_terms_of_use(&self) -> bool {
        matches!(self.kind, RequirementKind::TermsOfUse)
    }

    pub fn is_managed(&self) -> bool {
        matches!(self.kind, RequirementKind::Managed { .. })
    }

    pub fn is_lock(&self) -> bool {
        matches!(self.kind, RequirementKind::Lock)
    }

    pub fn expiration_period(&self) -> Option<Duration> {
        match self.kind {
            RequirementKind::Managed { expiration_period } => expiration_period,
            _ => None,
        }
    }

    pub fn covers(&self, subject: &RestrictableObject) -> bool {
        self.subjects.contains(subject)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::{
        AccessRequirement, AccessType, EvaluationId, NodeId, PrincipalId, RequirementId,
        RequirementKind, RestrictableObject,
    };

    #[test]
    fn kinds() {
        let managed = AccessRequirement::new(
            RequirementId::new(1),
            RequirementKind::Managed {
                expiration_period: Some(Duration::from_secs(60)),
            },
            [RestrictableObject::Entity(NodeId::new(5))],
            PrincipalId::new(1),
        );
        assert!(managed.is_managed());
        assert_eq!(managed.expiration_period(), Some(Duration::from_secs(60)));
        assert_eq!(managed.access_type, AccessType::Download);
        assert!(managed.covers(&RestrictableObject::Entity(NodeId::new(5))));
        assert!(!managed.covers(&RestrictableObject::Entity(NodeId::new(6))));

        let terms = AccessRequirement::new(
            RequirementId::new(2),
            RequirementKind::TermsOfUse,
            [RestrictableObject::Evaluation(EvaluationId::new(5))],
            PrincipalId::new(1),
        )
        .with_access_type(AccessType::Participate);
        assert!(terms.is_terms_of_use());
        assert_eq!(terms.expiration_period(), None);
        assert!(!terms.covers(&RestrictableObject::Entity(NodeId::new(5))));
    }
}
