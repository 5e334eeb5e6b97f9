// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory persistence for nodes, ACLs, access requirements, approvals and principals.
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use petgraph::Direction;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::Dfs;
use sylvan_core::{
    AccessApproval, AccessRequirement, AccessType, AccessorGroup, AccessorGroupFilter, Acl,
    ApprovalId, ApprovalState, Etag, EvaluationId, InvitationId, MembershipRequestId, MessageId,
    Node, NodeId, PrincipalId, RequirementId, Resource, RestrictableObject, Timestamp, UserInfo,
    VerificationId, WikiId,
};
use tracing::{debug, trace};

use crate::traits::{
    AclStore, ApprovalStore, BenefactorIndex, HierarchyStore, MembershipInvitation,
    MembershipRequest, MessageParticipants, ObjectDirectory, PrincipalDirectory,
    RequirementStore, StoreError,
};

#[derive(Clone, Debug)]
struct PrincipalRecord {
    is_admin: bool,
    is_anonymous: bool,
    groups: BTreeSet<PrincipalId>,
}

/// State of the in-memory store.
///
/// The hierarchy is kept twice: as `parent_id` on every node and as edges from parent to child
/// in a directed graph which is used for child lookups and descendant walks.
#[derive(Clone, Debug, Default)]
pub struct InnerMemoryStore {
    nodes: HashMap<NodeId, Node>,
    tree: DiGraphMap<NodeId, ()>,
    benefactors: HashMap<NodeId, NodeId>,
    acls: HashMap<Resource, Acl>,
    requirements: BTreeMap<RequirementId, AccessRequirement>,
    approvals: BTreeMap<ApprovalId, AccessApproval>,
    next_approval_id: u64,
    principals: HashMap<PrincipalId, PrincipalRecord>,
    team_admins: HashSet<(PrincipalId, PrincipalId)>,
    messages: HashMap<MessageId, MessageParticipants>,
    wikis: HashMap<WikiId, Resource>,
    verifications: HashMap<VerificationId, PrincipalId>,
    invitations: HashMap<InvitationId, MembershipInvitation>,
    membership_requests: HashMap<MembershipRequestId, MembershipRequest>,
    docker_repositories: HashMap<String, NodeId>,
    docker_submissions: HashMap<NodeId, BTreeSet<EvaluationId>>,
}

impl InnerMemoryStore {
    fn node(&self, id: NodeId) -> Result<&Node, StoreError> {
        self.nodes
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(format!("node {id}")))
    }

    fn path(&self, id: NodeId) -> Result<Vec<NodeId>, StoreError> {
        let mut path = vec![id];
        let mut current = self.node(id)?;
        while let Some(parent_id) = current.parent_id {
            path.push(parent_id);
            current = self.node(parent_id)?;
        }
        path.reverse();
        Ok(path)
    }

    fn is_descendant(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut dfs = Dfs::new(&self.tree, ancestor);
        while let Some(nx) = dfs.next(&self.tree) {
            if nx == id {
                return true;
            }
        }
        false
    }

    fn principal(&self, id: PrincipalId) -> Result<&PrincipalRecord, StoreError> {
        self.principals
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(format!("principal {id}")))
    }
}

/// An in-memory store implementing all collaborator interfaces.
///
/// `MemoryStore` can be shared between threads, it wraps an `InnerMemoryStore` with an `RwLock`
/// and `Arc`. Cloning the store is cheap and all clones see the same state.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<InnerMemoryStore>>,
}

impl MemoryStore {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Obtain a read-lock on the store.
    pub fn read_store(&self) -> RwLockReadGuard<'_, InnerMemoryStore> {
        self.inner
            .read()
            .expect("acquire shared read access on store")
    }

    /// Obtain a write-lock on the store.
    pub fn write_store(&self) -> RwLockWriteGuard<'_, InnerMemoryStore> {
        self.inner
            .write()
            .expect("acquire exclusive write access on store")
    }

    /// Register a principal and its group memberships.
    pub fn insert_principal(&self, user: &UserInfo, is_anonymous: bool) {
        self.write_store().principals.insert(
            user.id,
            PrincipalRecord {
                is_admin: user.is_admin,
                is_anonymous,
                groups: user.groups.clone(),
            },
        );
    }

    pub fn insert_team_admin(&self, team_id: PrincipalId, principal_id: PrincipalId) {
        self.write_store().team_admins.insert((team_id, principal_id));
    }

    pub fn insert_message(&self, id: MessageId, participants: MessageParticipants) {
        self.write_store().messages.insert(id, participants);
    }

    pub fn insert_wiki(&self, id: WikiId, owner: Resource) {
        self.write_store().wikis.insert(id, owner);
    }

    pub fn insert_verification(&self, id: VerificationId, submitter_id: PrincipalId) {
        self.write_store().verifications.insert(id, submitter_id);
    }

    pub fn insert_invitation(&self, id: InvitationId, invitation: MembershipInvitation) {
        self.write_store().invitations.insert(id, invitation);
    }

    pub fn insert_membership_request(&self, id: MembershipRequestId, request: MembershipRequest) {
        self.write_store().membership_requests.insert(id, request);
    }

    pub fn insert_docker_repository(&self, name: &str, repository_id: NodeId) {
        self.write_store()
            .docker_repositories
            .insert(name.to_string(), repository_id);
    }

    pub fn insert_docker_submission(&self, repository_id: NodeId, evaluation_id: EvaluationId) {
        self.write_store()
            .docker_submissions
            .entry(repository_id)
            .or_default()
            .insert(evaluation_id);
    }
}

impl HierarchyStore for MemoryStore {
    fn get_node(&self, id: NodeId) -> Result<Option<Node>, StoreError> {
        Ok(self.read_store().nodes.get(&id).cloned())
    }

    fn insert_node(&self, node: Node) -> Result<Node, StoreError> {
        let mut store = self.write_store();

        if store.nodes.contains_key(&node.id) {
            return Err(StoreError::AlreadyExists(format!("node {}", node.id)));
        }

        if let Some(parent_id) = node.parent_id {
            store.node(parent_id)?;
        }

        store.tree.add_node(node.id);
        if let Some(parent_id) = node.parent_id {
            store.tree.add_edge(parent_id, node.id, ());
        }

        store.nodes.insert(node.id, node.clone());
        Ok(node)
    }

    fn update_node(&self, mut node: Node) -> Result<Node, StoreError> {
        let mut store = self.write_store();
        let existing = store.node(node.id)?;

        if existing.etag != node.etag {
            return Err(StoreError::ConflictingUpdate {
                id: format!("node {}", node.id),
                expected: node.etag,
                actual: existing.etag,
            });
        }

        node.parent_id = existing.parent_id;
        node.etag = existing.etag.next();
        node.modified_on = Timestamp::now();
        store.nodes.insert(node.id, node.clone());
        Ok(node)
    }

    fn get_parent_id(&self, id: NodeId) -> Result<Option<NodeId>, StoreError> {
        Ok(self.read_store().node(id)?.parent_id)
    }

    fn get_children(&self, id: NodeId) -> Result<Vec<NodeId>, StoreError> {
        let store = self.read_store();
        store.node(id)?;

        let mut children: Vec<NodeId> = store
            .tree
            .neighbors_directed(id, Direction::Outgoing)
            .collect();
        children.sort();
        Ok(children)
    }

    fn set_parent(&self, id: NodeId, parent_id: NodeId, etag: Etag) -> Result<Node, StoreError> {
        let mut store = self.write_store();
        store.node(parent_id)?;
        let existing = store.node(id)?.clone();

        if existing.etag != etag {
            return Err(StoreError::ConflictingUpdate {
                id: format!("node {id}"),
                expected: etag,
                actual: existing.etag,
            });
        }

        if store.is_descendant(id, parent_id) {
            return Err(StoreError::Cycle {
                node: id,
                parent: parent_id,
            });
        }

        if let Some(old_parent_id) = existing.parent_id {
            store.tree.remove_edge(old_parent_id, id);
        }
        store.tree.add_edge(parent_id, id, ());

        let node = Node {
            parent_id: Some(parent_id),
            etag: existing.etag.next(),
            modified_on: Timestamp::now(),
            ..existing
        };
        store.nodes.insert(id, node.clone());
        debug!(%id, %parent_id, "moved node");
        Ok(node)
    }

    fn get_path(&self, id: NodeId) -> Result<Vec<NodeId>, StoreError> {
        self.read_store().path(id)
    }
}

impl BenefactorIndex for MemoryStore {
    fn get_benefactor(&self, id: NodeId) -> Result<NodeId, StoreError> {
        self.read_store()
            .benefactors
            .get(&id)
            .copied()
            .ok_or_else(|| StoreError::NotFound(format!("benefactor of node {id}")))
    }

    fn set_benefactor(&self, id: NodeId, benefactor_id: NodeId) -> Result<(), StoreError> {
        self.set_all(&[(id, benefactor_id)])
    }

    fn set_all(&self, updates: &[(NodeId, NodeId)]) -> Result<(), StoreError> {
        let mut store = self.write_store();

        // Validate the whole batch before touching the index.
        for (id, benefactor_id) in updates {
            store.node(*id)?;
            store.node(*benefactor_id)?;
        }

        for (id, benefactor_id) in updates {
            store.benefactors.insert(*id, *benefactor_id);
        }
        trace!(count = updates.len(), "updated benefactors");
        Ok(())
    }

    fn get_benefactors(&self, ids: &[NodeId]) -> Result<BTreeMap<NodeId, NodeId>, StoreError> {
        let store = self.read_store();
        ids.iter()
            .map(|id| {
                store
                    .benefactors
                    .get(id)
                    .map(|benefactor_id| (*id, *benefactor_id))
                    .ok_or_else(|| StoreError::NotFound(format!("benefactor of node {id}")))
            })
            .collect()
    }
}

impl AclStore for MemoryStore {
    fn get_acl(&self, owner: &Resource) -> Result<Option<Acl>, StoreError> {
        Ok(self.read_store().acls.get(owner).cloned())
    }

    fn create_acl(&self, mut acl: Acl) -> Result<Acl, StoreError> {
        let mut store = self.write_store();

        if store.acls.contains_key(&acl.owner) {
            return Err(StoreError::AlreadyExists(format!("acl of {}", acl.owner)));
        }

        acl.etag = acl.etag.next();
        acl.modified_on = Timestamp::now();
        store.acls.insert(acl.owner, acl.clone());
        Ok(acl)
    }

    fn update_acl(&self, mut acl: Acl) -> Result<Acl, StoreError> {
        let mut store = self.write_store();
        let Some(existing) = store.acls.get(&acl.owner) else {
            return Err(StoreError::NotFound(format!("acl of {}", acl.owner)));
        };

        if existing.etag != acl.etag {
            return Err(StoreError::ConflictingUpdate {
                id: format!("acl of {}", acl.owner),
                expected: acl.etag,
                actual: existing.etag,
            });
        }

        acl.etag = existing.etag.next();
        acl.modified_on = Timestamp::now();
        store.acls.insert(acl.owner, acl.clone());
        Ok(acl)
    }

    fn delete_acl(&self, owner: &Resource) -> Result<bool, StoreError> {
        Ok(self.write_store().acls.remove(owner).is_some())
    }

    fn get_accessible_benefactors(
        &self,
        groups: &BTreeSet<PrincipalId>,
        candidates: &BTreeSet<NodeId>,
        access_type: AccessType,
    ) -> Result<BTreeSet<NodeId>, StoreError> {
        let store = self.read_store();
        Ok(candidates
            .iter()
            .filter(|id| {
                store
                    .acls
                    .get(&Resource::Entity(**id))
                    .is_some_and(|acl| acl.permits(groups, access_type))
            })
            .copied()
            .collect())
    }
}

impl RequirementStore for MemoryStore {
    fn get_requirement(&self, id: RequirementId) -> Result<Option<AccessRequirement>, StoreError> {
        Ok(self.read_store().requirements.get(&id).cloned())
    }

    fn create_requirement(
        &self,
        mut requirement: AccessRequirement,
    ) -> Result<AccessRequirement, StoreError> {
        let mut store = self.write_store();

        if store.requirements.contains_key(&requirement.id) {
            return Err(StoreError::AlreadyExists(format!(
                "access requirement {}",
                requirement.id
            )));
        }

        requirement.etag = requirement.etag.next();
        requirement.modified_on = Timestamp::now();
        store
            .requirements
            .insert(requirement.id, requirement.clone());
        Ok(requirement)
    }

    fn update_requirement(
        &self,
        mut requirement: AccessRequirement,
    ) -> Result<AccessRequirement, StoreError> {
        let mut store = self.write_store();
        let Some(existing) = store.requirements.get(&requirement.id) else {
            return Err(StoreError::NotFound(format!(
                "access requirement {}",
                requirement.id
            )));
        };

        if existing.etag != requirement.etag {
            return Err(StoreError::ConflictingUpdate {
                id: format!("access requirement {}", requirement.id),
                expected: requirement.etag,
                actual: existing.etag,
            });
        }

        requirement.version = existing.version + 1;
        requirement.etag = existing.etag.next();
        requirement.modified_on = Timestamp::now();
        store
            .requirements
            .insert(requirement.id, requirement.clone());
        Ok(requirement)
    }

    fn delete_requirement(&self, id: RequirementId) -> Result<bool, StoreError> {
        Ok(self.write_store().requirements.remove(&id).is_some())
    }

    fn get_applicable_requirements(
        &self,
        subject: &RestrictableObject,
        access_type: AccessType,
    ) -> Result<Vec<AccessRequirement>, StoreError> {
        let store = self.read_store();

        let subjects: Vec<RestrictableObject> = match subject {
            RestrictableObject::Entity(id) => store
                .path(*id)?
                .into_iter()
                .map(RestrictableObject::Entity)
                .collect(),
            other => vec![*other],
        };

        Ok(store
            .requirements
            .values()
            .filter(|requirement| requirement.access_type == access_type)
            .filter(|requirement| subjects.iter().any(|subject| requirement.covers(subject)))
            .cloned()
            .collect())
    }
}

impl ApprovalStore for MemoryStore {
    fn get_approval(&self, id: ApprovalId) -> Result<Option<AccessApproval>, StoreError> {
        Ok(self.read_store().approvals.get(&id).cloned())
    }

    fn create_or_update_approval(
        &self,
        approval: AccessApproval,
    ) -> Result<AccessApproval, StoreError> {
        let mut store = self.write_store();
        let now = Timestamp::now();

        let existing = store.approvals.values_mut().find(|existing| {
            existing.requirement_id == approval.requirement_id
                && existing.submitter_id == approval.submitter_id
                && existing.accessor_id == approval.accessor_id
        });

        let stored = match existing {
            Some(existing) => {
                existing.requirement_version = approval.requirement_version;
                existing.expired_on = approval.expired_on;
                existing.state = approval.state;
                existing.revoked_by = approval.revoked_by;
                existing.modified_on = now;
                existing.etag = existing.etag.next();
                existing.clone()
            }
            None => {
                store.next_approval_id += 1;
                let stored = AccessApproval {
                    id: ApprovalId::new(store.next_approval_id),
                    created_on: now,
                    modified_on: now,
                    etag: approval.etag.next(),
                    ..approval
                };
                store.approvals.insert(stored.id, stored.clone());
                stored
            }
        };

        debug!(
            approval_id = %stored.id,
            requirement_id = %stored.requirement_id,
            accessor_id = %stored.accessor_id,
            "stored access approval"
        );
        Ok(stored)
    }

    fn list_by_accessor(
        &self,
        requirement_id: RequirementId,
        accessor_id: PrincipalId,
    ) -> Result<Vec<AccessApproval>, StoreError> {
        Ok(self
            .read_store()
            .approvals
            .values()
            .filter(|approval| {
                approval.requirement_id == requirement_id && approval.accessor_id == accessor_id
            })
            .cloned()
            .collect())
    }

    fn list_by_submitter(
        &self,
        requirement_id: RequirementId,
        submitter_id: PrincipalId,
    ) -> Result<Vec<AccessApproval>, StoreError> {
        Ok(self
            .read_store()
            .approvals
            .values()
            .filter(|approval| {
                approval.requirement_id == requirement_id && approval.submitter_id == submitter_id
            })
            .cloned()
            .collect())
    }

    fn list_accessor_groups(
        &self,
        filter: &AccessorGroupFilter,
    ) -> Result<Vec<AccessorGroup>, StoreError> {
        let store = self.read_store();

        let mut groups: BTreeMap<(RequirementId, PrincipalId), AccessorGroup> = BTreeMap::new();
        for approval in store
            .approvals
            .values()
            .filter(|approval| approval.state == ApprovalState::Approved)
        {
            let group = groups
                .entry((approval.requirement_id, approval.submitter_id))
                .or_insert_with(|| AccessorGroup {
                    requirement_id: approval.requirement_id,
                    submitter_id: approval.submitter_id,
                    accessor_ids: BTreeSet::new(),
                    expired_on: None,
                });
            group.accessor_ids.insert(approval.accessor_id);
            group.expired_on = match (group.expired_on, approval.expired_on) {
                (Some(current), Some(expired_on)) => Some(current.min(expired_on)),
                (current, expired_on) => current.or(expired_on),
            };
        }

        Ok(groups
            .into_values()
            .filter(|group| filter.matches(group))
            .collect())
    }

    fn revoke_batch(
        &self,
        ids: &[ApprovalId],
        revoked_by: PrincipalId,
    ) -> Result<Vec<ApprovalId>, StoreError> {
        let mut store = self.write_store();

        let mut revoked = Vec::new();
        for id in ids {
            if let Some(approval) = store.approvals.get_mut(id) {
                if approval.state == ApprovalState::Approved {
                    approval.revoke(revoked_by);
                    revoked.push(*id);
                }
            }
        }

        debug!(count = revoked.len(), %revoked_by, "revoked access approvals");
        Ok(revoked)
    }

    fn list_expired(&self, now: Timestamp, limit: usize) -> Result<Vec<ApprovalId>, StoreError> {
        Ok(self
            .read_store()
            .approvals
            .values()
            .filter(|approval| approval.state == ApprovalState::Approved)
            .filter(|approval| approval.is_expired(now))
            .map(|approval| approval.id)
            .take(limit)
            .collect())
    }
}

impl PrincipalDirectory for MemoryStore {
    fn get_groups(&self, principal_id: PrincipalId) -> Result<BTreeSet<PrincipalId>, StoreError> {
        Ok(self.read_store().principal(principal_id)?.groups.clone())
    }

    fn is_admin(&self, principal_id: PrincipalId) -> Result<bool, StoreError> {
        Ok(self.read_store().principal(principal_id)?.is_admin)
    }

    fn is_anonymous(&self, principal_id: PrincipalId) -> Result<bool, StoreError> {
        Ok(self.read_store().principal(principal_id)?.is_anonymous)
    }

    fn is_team_admin(
        &self,
        team_id: PrincipalId,
        principal_id: PrincipalId,
    ) -> Result<bool, StoreError> {
        Ok(self
            .read_store()
            .team_admins
            .contains(&(team_id, principal_id)))
    }
}

impl ObjectDirectory for MemoryStore {
    fn get_message_participants(
        &self,
        id: MessageId,
    ) -> Result<Option<MessageParticipants>, StoreError> {
        Ok(self.read_store().messages.get(&id).cloned())
    }

    fn get_wiki_owner(&self, id: WikiId) -> Result<Option<Resource>, StoreError> {
        Ok(self.read_store().wikis.get(&id).copied())
    }

    fn get_verification_submitter(
        &self,
        id: VerificationId,
    ) -> Result<Option<PrincipalId>, StoreError> {
        Ok(self.read_store().verifications.get(&id).copied())
    }

    fn get_invitation(
        &self,
        id: InvitationId,
    ) -> Result<Option<MembershipInvitation>, StoreError> {
        Ok(self.read_store().invitations.get(&id).copied())
    }

    fn get_membership_request(
        &self,
        id: MembershipRequestId,
    ) -> Result<Option<MembershipRequest>, StoreError> {
        Ok(self.read_store().membership_requests.get(&id).copied())
    }

    fn get_docker_repository(&self, name: &str) -> Result<Option<NodeId>, StoreError> {
        Ok(self.read_store().docker_repositories.get(name).copied())
    }

    fn get_docker_submissions(
        &self,
        repository_id: NodeId,
    ) -> Result<Vec<EvaluationId>, StoreError> {
        Ok(self
            .read_store()
            .docker_submissions
            .get(&repository_id)
            .map(|evaluations| evaluations.iter().copied().collect())
            .unwrap_or_default())
    }
}
