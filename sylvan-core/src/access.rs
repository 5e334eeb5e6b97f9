// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeSet;
use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{
    ApprovalId, DataAccessId, EvaluationId, InvitationId, MembershipRequestId, MessageId,
    ModelError, NodeId, PrincipalId, RequirementId, VerificationId, WikiId,
};

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident, $error:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(
            Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value),+
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ModelError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($value => Ok($name::$variant),)+
                    _ => Err(ModelError::$error(value.to_string())),
                }
            }
        }
    };
}

string_enum!(
    /// Kind of action a principal wants to perform on a resource.
    AccessType, UnknownAccessType {
        Create => "CREATE",
        Read => "READ",
        Update => "UPDATE",
        Delete => "DELETE",
        ChangePermissions => "CHANGE_PERMISSIONS",
        Download => "DOWNLOAD",
        Upload => "UPLOAD",
        Participate => "PARTICIPATE",
        Submit => "SUBMIT",
        ReadPrivateSubmission => "READ_PRIVATE_SUBMISSION",
        UpdateSubmission => "UPDATE_SUBMISSION",
        DeleteSubmission => "DELETE_SUBMISSION",
        TeamMembershipUpdate => "TEAM_MEMBERSHIP_UPDATE",
        SendMessage => "SEND_MESSAGE",
        ChangeSettings => "CHANGE_SETTINGS",
        Moderate => "MODERATE",
        ReviewSubmissions => "REVIEW_SUBMISSIONS",
        ExemptionEligible => "EXEMPTION_ELIGIBLE",
    }
);

impl AccessType {
    /// Access types granted to the creator of a top-level entity.
    pub fn entity_admin() -> BTreeSet<AccessType> {
        BTreeSet::from([
            AccessType::Read,
            AccessType::Download,
            AccessType::Create,
            AccessType::Update,
            AccessType::Delete,
            AccessType::ChangePermissions,
            AccessType::ChangeSettings,
            AccessType::Moderate,
        ])
    }

    /// Access types which modify a resource or its permissions.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            AccessType::Create
                | AccessType::Update
                | AccessType::Delete
                | AccessType::ChangePermissions
                | AccessType::ChangeSettings
                | AccessType::Moderate
        )
    }
}

string_enum!(
    /// Kind of resource an authorization request is about.
    ObjectType, UnknownObjectType {
        Entity => "ENTITY",
        Evaluation => "EVALUATION",
        Team => "TEAM",
        AccessRequirement => "ACCESS_REQUIREMENT",
        AccessApproval => "ACCESS_APPROVAL",
        MembershipInvitation => "MEMBERSHIP_INVITATION",
        MembershipRequest => "MEMBERSHIP_REQUEST",
        Message => "MESSAGE",
        EvaluationSubmissions => "EVALUATION_SUBMISSIONS",
        DataAccessRequest => "DATA_ACCESS_REQUEST",
        DataAccessSubmission => "DATA_ACCESS_SUBMISSION",
        UserProfile => "USER_PROFILE",
        Wiki => "WIKI",
        VerificationSubmission => "VERIFICATION_SUBMISSION",
    }
);

/// A resource identified by its type and id.
///
/// Every variant carries the typed identifier of exactly one object. Authorization dispatches on
/// the variant with a single `match`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resource {
    Entity(NodeId),
    Evaluation(EvaluationId),
    Team(PrincipalId),
    AccessRequirement(RequirementId),
    AccessApproval(ApprovalId),
    MembershipInvitation(InvitationId),
    MembershipRequest(MembershipRequestId),
    Message(MessageId),
    /// Submissions of the given evaluation.
    EvaluationSubmissions(EvaluationId),
    DataAccessRequest(DataAccessId),
    DataAccessSubmission(DataAccessId),
    UserProfile(PrincipalId),
    Wiki(WikiId),
    VerificationSubmission(VerificationId),
}

impl Resource {
    /// Parses the string id of a resource of the given type.
    pub fn parse(object_type: ObjectType, id: &str) -> Result<Self, ModelError> {
        let resource = match object_type {
            ObjectType::Entity => Resource::Entity(id.parse()?),
            ObjectType::Evaluation => Resource::Evaluation(id.parse()?),
            ObjectType::Team => Resource::Team(id.parse()?),
            ObjectType::AccessRequirement => Resource::AccessRequirement(id.parse()?),
            ObjectType::AccessApproval => Resource::AccessApproval(id.parse()?),
            ObjectType::MembershipInvitation => Resource::MembershipInvitation(id.parse()?),
            ObjectType::MembershipRequest => Resource::MembershipRequest(id.parse()?),
            ObjectType::Message => Resource::Message(id.parse()?),
            ObjectType::EvaluationSubmissions => Resource::EvaluationSubmissions(id.parse()?),
            ObjectType::DataAccessRequest => Resource::DataAccessRequest(id.parse()?),
            ObjectType::DataAccessSubmission => Resource::DataAccessSubmission(id.parse()?),
            ObjectType::UserProfile => Resource::UserProfile(id.parse()?),
            ObjectType::Wiki => Resource::Wiki(id.parse()?),
            ObjectType::VerificationSubmission => Resource::VerificationSubmission(id.parse()?),
        };
        Ok(resource)
    }

    pub fn object_type(&self) -> ObjectType {
        match self {
            Resource::Entity(_) => ObjectType::Entity,
            Resource::Evaluation(_) => ObjectType::Evaluation,
            Resource::Team(_) => ObjectType::Team,
            Resource::AccessRequirement(_) => ObjectType::AccessRequirement,
            Resource::AccessApproval(_) => ObjectType::AccessApproval,
            Resource::MembershipInvitation(_) => ObjectType::MembershipInvitation,
            Resource::MembershipRequest(_) => ObjectType::MembershipRequest,
            Resource::Message(_) => ObjectType::Message,
            Resource::EvaluationSubmissions(_) => ObjectType::EvaluationSubmissions,
            Resource::DataAccessRequest(_) => ObjectType::DataAccessRequest,
            Resource::DataAccessSubmission(_) => ObjectType::DataAccessSubmission,
            Resource::UserProfile(_) => ObjectType::UserProfile,
            Resource::Wiki(_) => ObjectType::Wiki,
            Resource::VerificationSubmission(_) => ObjectType::VerificationSubmission,
        }
    }
}

impl Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let id = match self {
            Resource::Entity(id) => id.to_string(),
            Resource::Evaluation(id) | Resource::EvaluationSubmissions(id) => id.to_string(),
            Resource::Team(id) | Resource::UserProfile(id) => id.to_string(),
            Resource::AccessRequirement(id) => id.to_string(),
            Resource::AccessApproval(id) => id.to_string(),
            Resource::MembershipInvitation(id) => id.to_string(),
            Resource::MembershipRequest(id) => id.to_string(),
            Resource::Message(id) => id.to_string(),
            Resource::DataAccessRequest(id) | Resource::DataAccessSubmission(id) => id.to_string(),
            Resource::Wiki(id) => id.to_string(),
            Resource::VerificationSubmission(id) => id.to_string(),
        };
        write!(f, "{} {}", self.object_type(), id)
    }
}

#[cfg(test)]
mod tests {
    use crate::{AccessType, ModelError, NodeId, ObjectType, PrincipalId, Resource};

    #[test]
    fn access_type_strings() {
        for access_type in AccessType::ALL {
            let parsed: AccessType = access_type.as_str().parse().unwrap();
            assert_eq!(&parsed, access_type);
        }

        assert_eq!(
            "READ_PRIVATE_SUBMISSION".parse::<AccessType>(),
            Ok(AccessType::ReadPrivateSubmission)
        );
        assert_eq!(
            "read".parse::<AccessType>(),
            Err(ModelError::UnknownAccessType("read".into()))
        );
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&AccessType::ChangeSettings).unwrap();
        assert_eq!(json, "\"CHANGE_SETTINGS\"");

        let object_type: ObjectType = serde_json::from_str("\"EVALUATION_SUBMISSIONS\"").unwrap();
        assert_eq!(object_type, ObjectType::EvaluationSubmissions);
    }

    #[test]
    fn entity_admin_grants() {
        let grants = AccessType::entity_admin();
        assert!(grants.contains(&AccessType::ChangePermissions));
        assert!(grants.contains(&AccessType::Download));
        assert!(!grants.contains(&AccessType::Upload));
        assert!(!grants.contains(&AccessType::Participate));
    }

    #[test]
    fn parse_resources() {
        assert_eq!(
            Resource::parse(ObjectType::Entity, "syn42"),
            Ok(Resource::Entity(NodeId::new(42)))
        );
        assert_eq!(
            Resource::parse(ObjectType::Team, "7"),
            Ok(Resource::Team(PrincipalId::new(7)))
        );
        assert!(Resource::parse(ObjectType::Team, "syn7").is_err());
        assert!(Resource::parse(ObjectType::Wiki, "").is_err());

        let resource = Resource::parse(ObjectType::UserProfile, "99").unwrap();
        assert_eq!(resource.object_type(), ObjectType::UserProfile);
        assert_eq!(resource.to_string(), "USER_PROFILE 99");
    }
}
