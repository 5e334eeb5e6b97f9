// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interfaces of the collaborators the access control engine reads from and writes to.
//!
//! All methods take `&self`, implementations are expected to be cheap to clone and to use
//! interior mutability so one store can be shared between concurrent requests.
use std::collections::{BTreeMap, BTreeSet};

use sylvan_core::{
    AccessApproval, AccessRequirement, AccessType, AccessorGroup, AccessorGroupFilter, Acl,
    ApprovalId, Etag, EvaluationId, InvitationId, MembershipRequestId, MessageId, Node, NodeId,
    PrincipalId, RequirementId, Resource, RestrictableObject, Timestamp, UserInfo,
    VerificationId, WikiId,
};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("conflicting update of {id}: expected etag {expected} but found {actual}")]
    ConflictingUpdate {
        id: String,
        expected: Etag,
        actual: Etag,
    },

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("moving {node} below {parent} would make it its own ancestor")]
    Cycle { node: NodeId, parent: NodeId },
}

/// Parent and child relations of entities.
pub trait HierarchyStore {
    fn get_node(&self, id: NodeId) -> Result<Option<Node>, StoreError>;

    /// Insert a new node. The parent must already exist.
    fn insert_node(&self, node: Node) -> Result<Node, StoreError>;

    /// Update the metadata of a node, compare-and-set on its etag. The parent can only be changed
    /// with [`HierarchyStore::set_parent`].
    fn update_node(&self, node: Node) -> Result<Node, StoreError>;

    /// Returns `None` for roots and [`StoreError::NotFound`] for unknown nodes.
    fn get_parent_id(&self, id: NodeId) -> Result<Option<NodeId>, StoreError>;

    fn get_children(&self, id: NodeId) -> Result<Vec<NodeId>, StoreError>;

    /// Move a node below a new parent, compare-and-set on the node's etag.
    ///
    /// Fails with [`StoreError::Cycle`] when the new parent is the node itself or one of its
    /// descendants.
    fn set_parent(&self, id: NodeId, parent_id: NodeId, etag: Etag) -> Result<Node, StoreError>;

    /// Ids from the root down to and including the given node.
    fn get_path(&self, id: NodeId) -> Result<Vec<NodeId>, StoreError>;
}

/// Materialised mapping from each node to the node whose ACL governs it.
pub trait BenefactorIndex {
    fn get_benefactor(&self, id: NodeId) -> Result<NodeId, StoreError>;

    fn set_benefactor(&self, id: NodeId, benefactor_id: NodeId) -> Result<(), StoreError>;

    /// Apply all updates at once. Readers observe either none or all of them.
    fn set_all(&self, updates: &[(NodeId, NodeId)]) -> Result<(), StoreError>;

    fn get_benefactors(&self, ids: &[NodeId]) -> Result<BTreeMap<NodeId, NodeId>, StoreError> {
        ids.iter()
            .map(|id| Ok((*id, self.get_benefactor(*id)?)))
            .collect()
    }
}

/// Access control lists of entities, evaluations and teams.
pub trait AclStore {
    fn get_acl(&self, owner: &Resource) -> Result<Option<Acl>, StoreError>;

    /// Fails with [`StoreError::AlreadyExists`] if the owner already has an ACL.
    fn create_acl(&self, acl: Acl) -> Result<Acl, StoreError>;

    /// Replace an ACL, compare-and-set on its etag. Returns the stored ACL with a new etag.
    fn update_acl(&self, acl: Acl) -> Result<Acl, StoreError>;

    /// Returns `false` when there was no ACL to delete.
    fn delete_acl(&self, owner: &Resource) -> Result<bool, StoreError>;

    fn can_access(
        &self,
        groups: &BTreeSet<PrincipalId>,
        owner: &Resource,
        access_type: AccessType,
    ) -> Result<bool, StoreError> {
        Ok(self
            .get_acl(owner)?
            .is_some_and(|acl| acl.permits(groups, access_type)))
    }

    /// Subset of the candidate benefactors whose ACL grants the access type to any of the groups.
    fn get_accessible_benefactors(
        &self,
        groups: &BTreeSet<PrincipalId>,
        candidates: &BTreeSet<NodeId>,
        access_type: AccessType,
    ) -> Result<BTreeSet<NodeId>, StoreError>;
}

pub trait RequirementStore {
    fn get_requirement(&self, id: RequirementId) -> Result<Option<AccessRequirement>, StoreError>;

    fn create_requirement(
        &self,
        requirement: AccessRequirement,
    ) -> Result<AccessRequirement, StoreError>;

    /// Replace a requirement, compare-and-set on its etag. The stored version is incremented.
    fn update_requirement(
        &self,
        requirement: AccessRequirement,
    ) -> Result<AccessRequirement, StoreError>;

    fn delete_requirement(&self, id: RequirementId) -> Result<bool, StoreError>;

    /// Requirements gating the given access type on a subject.
    ///
    /// Requirements on an entity apply to all of its descendants, so for entities the
    /// requirements of every ancestor are included. Evaluations and teams only match directly.
    fn get_applicable_requirements(
        &self,
        subject: &RestrictableObject,
        access_type: AccessType,
    ) -> Result<Vec<AccessRequirement>, StoreError>;
}

pub trait ApprovalStore {
    fn get_approval(&self, id: ApprovalId) -> Result<Option<AccessApproval>, StoreError>;

    /// Store an approval. An existing approval for the same requirement, submitter and accessor
    /// is superseded: it keeps its id and takes over version, expiry and state of the new one.
    fn create_or_update_approval(
        &self,
        approval: AccessApproval,
    ) -> Result<AccessApproval, StoreError>;

    /// All approvals of a requirement held by an accessor, in any state.
    fn list_by_accessor(
        &self,
        requirement_id: RequirementId,
        accessor_id: PrincipalId,
    ) -> Result<Vec<AccessApproval>, StoreError>;

    fn list_by_submitter(
        &self,
        requirement_id: RequirementId,
        submitter_id: PrincipalId,
    ) -> Result<Vec<AccessApproval>, StoreError>;

    /// Approved accessors grouped by requirement and submitter.
    fn list_accessor_groups(
        &self,
        filter: &AccessorGroupFilter,
    ) -> Result<Vec<AccessorGroup>, StoreError>;

    /// Revoke the given approvals. Returns the ids which were approved before.
    fn revoke_batch(
        &self,
        ids: &[ApprovalId],
        revoked_by: PrincipalId,
    ) -> Result<Vec<ApprovalId>, StoreError>;

    /// Approved approvals which expired at or before `now`, at most `limit` of them.
    fn list_expired(&self, now: Timestamp, limit: usize) -> Result<Vec<ApprovalId>, StoreError>;

    /// Approval which is unrevoked, unexpired and granted for exactly the given version.
    fn get_valid_approval(
        &self,
        requirement_id: RequirementId,
        requirement_version: u64,
        accessor_id: PrincipalId,
        now: Timestamp,
    ) -> Result<Option<AccessApproval>, StoreError> {
        Ok(self
            .list_by_accessor(requirement_id, accessor_id)?
            .into_iter()
            .find(|approval| approval.is_valid(requirement_version, now, false)))
    }
}

pub trait PrincipalDirectory {
    fn get_groups(&self, principal_id: PrincipalId) -> Result<BTreeSet<PrincipalId>, StoreError>;

    fn is_admin(&self, principal_id: PrincipalId) -> Result<bool, StoreError>;

    fn is_anonymous(&self, principal_id: PrincipalId) -> Result<bool, StoreError>;

    fn is_team_admin(
        &self,
        team_id: PrincipalId,
        principal_id: PrincipalId,
    ) -> Result<bool, StoreError>;

    fn get_user_info(&self, principal_id: PrincipalId) -> Result<UserInfo, StoreError> {
        Ok(UserInfo::new(
            principal_id,
            self.is_admin(principal_id)?,
            self.get_groups(principal_id)?,
        ))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageParticipants {
    pub sender_id: PrincipalId,
    pub recipient_ids: BTreeSet<PrincipalId>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MembershipInvitation {
    pub team_id: PrincipalId,
    pub invitee_id: PrincipalId,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MembershipRequest {
    pub team_id: PrincipalId,
    pub user_id: PrincipalId,
}

/// Lookups of the objects which are not part of the entity hierarchy.
pub trait ObjectDirectory {
    fn get_message_participants(
        &self,
        id: MessageId,
    ) -> Result<Option<MessageParticipants>, StoreError>;

    /// Entity, evaluation or access requirement a wiki page belongs to.
    fn get_wiki_owner(&self, id: WikiId) -> Result<Option<Resource>, StoreError>;

    fn get_verification_submitter(
        &self,
        id: VerificationId,
    ) -> Result<Option<PrincipalId>, StoreError>;

    fn get_invitation(
        &self,
        id: InvitationId,
    ) -> Result<Option<MembershipInvitation>, StoreError>;

    fn get_membership_request(
        &self,
        id: MembershipRequestId,
    ) -> Result<Option<MembershipRequest>, StoreError>;

    /// Entity of the docker repository with the given name, for example
    /// `docker.synapse.org/syn123/my-repo`.
    fn get_docker_repository(&self, name: &str) -> Result<Option<NodeId>, StoreError>;

    /// Evaluations a docker repository was submitted to.
    fn get_docker_submissions(
        &self,
        repository_id: NodeId,
    ) -> Result<Vec<EvaluationId>, StoreError>;
}

/// Everything the access control engine needs from its storage backend.
pub trait Store:
    HierarchyStore
    + BenefactorIndex
    + AclStore
    + RequirementStore
    + ApprovalStore
    + PrincipalDirectory
    + ObjectDirectory
{
}

impl<T> Store for T where
    T: HierarchyStore
        + BenefactorIndex
        + AclStore
        + RequirementStore
        + ApprovalStore
        + PrincipalDirectory
        + ObjectDirectory
{
}
