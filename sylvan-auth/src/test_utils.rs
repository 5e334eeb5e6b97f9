// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixtures for testing authorization against an in-memory store.
use sylvan_core::{AccessType, Acl, EntityType, Node, NodeId, PrincipalId, Resource, UserInfo};
use sylvan_store::{AclStore, BenefactorIndex, HierarchyStore, MemoryStore};

use crate::{
    ApprovalManager, AuthError, AuthorizationManager, Config, InheritanceManager,
    PermissionsManager,
};

pub fn setup_logging() {
    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }
}

/// A bootstrapped memory store with all managers wired to it.
pub struct TestWorld {
    pub config: Config,
    pub store: MemoryStore,
    pub permissions: PermissionsManager<MemoryStore>,
    pub authorization: AuthorizationManager<MemoryStore>,
    pub approvals: ApprovalManager<MemoryStore>,
    pub admin: UserInfo,
    pub act: UserInfo,
    pub anonymous: UserInfo,
    next_id: u64,
}

impl TestWorld {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        setup_logging();

        let store = MemoryStore::new();
        let permissions = PermissionsManager::new(store.clone(), config.clone());
        let authorization = AuthorizationManager::new(store.clone(), config.clone());
        let approvals = ApprovalManager::new(store.clone(), config.clone());

        let admin = UserInfo::admin(PrincipalId::new(1), &config.principals);
        let act = UserInfo::user(PrincipalId::new(2), &config.principals)
            .with_group(config.principals.act_team_id);
        let anonymous = config.anonymous_user();

        store.insert_principal(&admin, false);
        store.insert_principal(&act, false);
        store.insert_principal(&anonymous, true);

        permissions
            .bootstrap(admin.id)
            .expect("bootstrap root and trash root");

        Self {
            config,
            store,
            permissions,
            authorization,
            approvals,
            admin,
            act,
            anonymous,
            next_id: 100,
        }
    }

    pub fn inheritance(&self) -> &InheritanceManager<MemoryStore> {
        self.permissions.inheritance()
    }

    /// Register a signed-in user.
    pub fn user(&self, id: u64) -> UserInfo {
        let user = UserInfo::user(PrincipalId::new(id), &self.config.principals);
        self.store.insert_principal(&user, false);
        user
    }

    pub fn certified_user(&self, id: u64) -> UserInfo {
        let user = UserInfo::user(PrincipalId::new(id), &self.config.principals)
            .with_group(self.config.principals.certified_users_group_id);
        self.store.insert_principal(&user, false);
        user
    }

    fn next_id(&mut self) -> NodeId {
        self.next_id += 1;
        NodeId::new(self.next_id)
    }

    /// Create a project below the root on behalf of the user.
    pub fn project(&mut self, owner: &UserInfo) -> Result<NodeId, AuthError> {
        let id = self.next_id();
        let root_id = self.config.root_id;
        self.entity(owner, id, root_id, EntityType::Project)
    }

    /// Create a folder on behalf of the user.
    pub fn folder(&mut self, owner: &UserInfo, parent_id: NodeId) -> Result<NodeId, AuthError> {
        let id = self.next_id();
        self.entity(owner, id, parent_id, EntityType::Folder)
    }

    pub fn file(&mut self, owner: &UserInfo, parent_id: NodeId) -> Result<NodeId, AuthError> {
        let id = self.next_id();
        self.entity(owner, id, parent_id, EntityType::File)
    }

    pub fn entity(
        &self,
        owner: &UserInfo,
        id: NodeId,
        parent_id: NodeId,
        entity_type: EntityType,
    ) -> Result<NodeId, AuthError> {
        let node = Node::new(id, Some(parent_id), entity_type, owner.id);
        Ok(self.permissions.create_node(owner, node)?.id)
    }

    /// Add access types for a principal to the ACL owned by the entity, bypassing authorization.
    pub fn grant(&self, id: NodeId, principal_id: PrincipalId, access_types: &[AccessType]) {
        let mut acl = self
            .store
            .get_acl(&Resource::Entity(id))
            .expect("read acl")
            .expect("entity owns an acl");
        acl.grant(principal_id, access_types.iter().copied());
        self.store.update_acl(acl).expect("update acl");
    }

    /// Give an inheriting entity its own ACL granting the access types, bypassing authorization.
    pub fn override_with(
        &self,
        id: NodeId,
        principal_id: PrincipalId,
        access_types: &[AccessType],
    ) -> Acl {
        let acl = self
            .store
            .create_acl(
                Acl::new(Resource::Entity(id), self.admin.id)
                    .with_access(principal_id, access_types.iter().copied()),
            )
            .expect("create acl");
        self.inheritance()
            .set_node_to_inherit_from_itself(id)
            .expect("inherit from itself");
        acl
    }

    pub fn benefactor(&self, id: NodeId) -> NodeId {
        self.store.get_benefactor(id).expect("benefactor exists")
    }

    /// Benefactor derived by walking up to the nearest ancestor owning an ACL.
    pub fn recompute_benefactor(&self, id: NodeId) -> NodeId {
        let path = self.store.get_path(id).expect("path exists");
        path.into_iter()
            .rev()
            .find(|ancestor_id| {
                self.store
                    .get_acl(&Resource::Entity(*ancestor_id))
                    .expect("read acl")
                    .is_some()
            })
            .expect("every path ends in a root owning an acl")
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}
