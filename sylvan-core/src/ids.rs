// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ModelError;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Copy,
            Clone,
            Debug,
            Default,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            Serialize,
            Deserialize,
        )]
        pub struct $name(u64);

        impl $name {
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            pub fn as_u64(&self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u64 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ModelError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                value
                    .trim()
                    .parse::<u64>()
                    .map(Self)
                    .map_err(|_| ModelError::InvalidId(value.to_string()))
            }
        }
    };
}

numeric_id!(
    /// Identifier of a user or a group of users (teams are groups, too).
    PrincipalId
);
numeric_id!(EvaluationId);
numeric_id!(RequirementId);
numeric_id!(ApprovalId);
numeric_id!(SubmissionId);
numeric_id!(MessageId);
numeric_id!(WikiId);
numeric_id!(InvitationId);
numeric_id!(MembershipRequestId);
numeric_id!(VerificationId);
numeric_id!(
    /// Identifier of a data access request or data access submission.
    DataAccessId
);

const NODE_ID_PREFIX: &str = "syn";

/// Identifier of a node (entity) in the hierarchy.
///
/// Node ids are rendered with a `syn` prefix, for example `syn123`. Parsing accepts the prefixed
/// form (in any letter case) as well as the bare number.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for NodeId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<NodeId> for u64 {
    fn from(value: NodeId) -> Self {
        value.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", NODE_ID_PREFIX, self.0)
    }
}

impl FromStr for NodeId {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let digits = match trimmed.get(..NODE_ID_PREFIX.len()) {
            Some(prefix) if prefix.eq_ignore_ascii_case(NODE_ID_PREFIX) => {
                &trimmed[NODE_ID_PREFIX.len()..]
            }
            _ => trimmed,
        };

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ModelError::InvalidId(value.to_string()));
        }

        digits
            .parse::<u64>()
            .map(Self)
            .map_err(|_| ModelError::InvalidId(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use crate::{ModelError, NodeId, PrincipalId};

    #[test]
    fn node_id_prefix() {
        assert_eq!(NodeId::new(123).to_string(), "syn123");
        assert_eq!("syn123".parse::<NodeId>(), Ok(NodeId::new(123)));
        assert_eq!("SYN123".parse::<NodeId>(), Ok(NodeId::new(123)));
        assert_eq!(" 123 ".parse::<NodeId>(), Ok(NodeId::new(123)));
    }

    #[test]
    fn malformed_node_ids() {
        for value in ["", "syn", "uname", "syn-1", "syn12a", "/invalid/"] {
            assert_eq!(
                value.parse::<NodeId>(),
                Err(ModelError::InvalidId(value.to_string())),
                "{value} should be rejected"
            );
        }
    }

    #[test]
    fn principal_ids_are_plain_numbers() {
        assert_eq!(PrincipalId::new(273949).to_string(), "273949");
        assert!("syn1".parse::<PrincipalId>().is_err());
    }
}
