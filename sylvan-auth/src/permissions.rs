// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lifecycle of entity ACLs and the structural changes which move benefactors around.
use sylvan_core::{AccessType, Acl, EntityType, Node, NodeId, PrincipalId, Resource, UserInfo};
use sylvan_store::Store;
use tracing::debug;

use crate::entity::EntityAuthorization;
use crate::inheritance::InheritanceManager;
use crate::requirements::lost_restrictions;
use crate::{AuthError, AuthorizationStatus, Config};

/// Result of asking for the ACL of an entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AclLookup {
    /// The entity is its own benefactor.
    Owned(Acl),

    /// The entity is governed by the ACL of this benefactor.
    Inherited(NodeId),
}

#[derive(Clone, Debug)]
pub struct PermissionsManager<S> {
    store: S,
    config: Config,
    inheritance: InheritanceManager<S>,
    entities: EntityAuthorization<S>,
}

impl<S> PermissionsManager<S>
where
    S: Store + Clone,
{
    pub fn new(store: S, config: Config) -> Self {
        Self {
            inheritance: InheritanceManager::new(store.clone(), config.clone()),
            entities: EntityAuthorization::new(store.clone(), config.clone()),
            store,
            config,
        }
    }

    /// Create the root and the trash root with their ACLs, unless they exist already.
    ///
    /// Every signed-in user may create projects below the root. The trash root's ACL is empty.
    pub fn bootstrap(&self, admin_id: PrincipalId) -> Result<(), AuthError> {
        let roots = [
            (
                self.config.root_id,
                Acl::new(Resource::Entity(self.config.root_id), admin_id).with_access(
                    self.config.principals.authenticated_users_group_id,
                    [AccessType::Create],
                ),
            ),
            (
                self.config.trash_root_id,
                Acl::new(Resource::Entity(self.config.trash_root_id), admin_id),
            ),
        ];

        for (id, acl) in roots {
            if self.store.get_node(id)?.is_some() {
                continue;
            }

            self.store
                .insert_node(Node::new(id, None, EntityType::Folder, admin_id))?;
            self.store.create_acl(acl)?;
            self.inheritance.set_node_to_inherit_from_itself(id)?;
            debug!(root = %id, "bootstrapped root");
        }

        Ok(())
    }

    /// Insert a new node on behalf of the user.
    ///
    /// Children of a root own an ACL granting their creator full control, all other nodes
    /// inherit the benefactor of their parent.
    pub fn create_node(&self, user: &UserInfo, node: Node) -> Result<Node, AuthError> {
        self.entities
            .can_create(user, node.parent_id, node.entity_type)?
            .check()?;

        let node = self.store.insert_node(Node {
            created_by: user.id,
            modified_by: user.id,
            ..node
        })?;

        match node.parent_id {
            Some(parent_id) if !self.config.is_root(parent_id) => {
                self.inheritance.node_parent_changed(node.id, parent_id)?;
            }
            _ => {
                self.store.create_acl(
                    Acl::new(Resource::Entity(node.id), user.id)
                        .with_access(user.id, AccessType::entity_admin()),
                )?;
                self.inheritance.set_node_to_inherit_from_itself(node.id)?;
            }
        }

        debug!(node = %node.id, user = %user.id, entity_type = %node.entity_type, "created node");
        Ok(node)
    }

    /// The ACL governing the entity, if the entity owns it, or the benefactor owning it.
    pub fn get_acl(&self, user: &UserInfo, id: NodeId) -> Result<AclLookup, AuthError> {
        self.require_node(id)?;
        self.entities
            .can_access(user, id, AccessType::Read)?
            .check()?;

        let benefactor_id = self.store.get_benefactor(id)?;
        if benefactor_id != id {
            return Ok(AclLookup::Inherited(benefactor_id));
        }

        let acl = self.owned_acl(id)?;
        Ok(AclLookup::Owned(acl))
    }

    /// Like [`PermissionsManager::get_acl`] but fails with [`AuthError::AclInheritance`] when the
    /// entity inherits its ACL.
    pub fn get_acl_or_error(&self, user: &UserInfo, id: NodeId) -> Result<Acl, AuthError> {
        match self.get_acl(user, id)? {
            AclLookup::Owned(acl) => Ok(acl),
            AclLookup::Inherited(benefactor_id) => Err(AuthError::AclInheritance {
                node_id: id,
                benefactor_id,
            }),
        }
    }

    /// Give an inheriting entity its own ACL. The entity becomes the benefactor of the
    /// descendants it shared its previous benefactor with.
    pub fn override_inheritance(&self, user: &UserInfo, acl: Acl) -> Result<Acl, AuthError> {
        let id = entity_of(&acl)?;
        let node = self.require_node(id)?;

        if self.store.get_benefactor(id)? == id {
            return Err(AuthError::IllegalArgument(format!(
                "entity {id} already has an ACL"
            )));
        }

        self.entities
            .can_access(user, id, AccessType::ChangePermissions)?
            .check()?;
        validate_acl_content(&acl, user, node.created_by)?;

        let acl = self.store.create_acl(Acl {
            created_by: user.id,
            ..acl
        })?;
        self.inheritance.set_node_to_inherit_from_itself(id)?;

        debug!(node = %id, user = %user.id, "overrode inheritance");
        Ok(acl)
    }

    /// Replace the ACL of an entity owning one. Fails with [`AuthError::ConflictingUpdate`] when
    /// the ACL changed since it was read.
    pub fn update_acl(&self, user: &UserInfo, acl: Acl) -> Result<Acl, AuthError> {
        let id = entity_of(&acl)?;
        let node = self.require_node(id)?;

        let benefactor_id = self.store.get_benefactor(id)?;
        if benefactor_id != id {
            return Err(AuthError::AclInheritance {
                node_id: id,
                benefactor_id,
            });
        }

        self.entities
            .can_access(user, id, AccessType::ChangePermissions)?
            .check()?;
        validate_acl_content(&acl, user, node.created_by)?;

        let acl = self.store.update_acl(acl)?;
        debug!(node = %id, user = %user.id, etag = %acl.etag, "updated ACL");
        Ok(acl)
    }

    /// Delete the ACL of an entity, it inherits from its nearest parent again. Returns the ACL
    /// now governing it.
    pub fn restore_inheritance(&self, user: &UserInfo, id: NodeId) -> Result<Acl, AuthError> {
        self.require_node(id)?;

        if self.store.get_benefactor(id)? != id {
            return Err(AuthError::IllegalArgument(format!(
                "entity {id} already inherits its permissions"
            )));
        }

        self.entities.can_delete_acl(user, id)?.check()?;

        self.store.delete_acl(&Resource::Entity(id))?;
        self.inheritance.set_node_to_inherit_from_nearest_parent(id)?;

        let benefactor_id = self.store.get_benefactor(id)?;
        debug!(node = %id, benefactor = %benefactor_id, "restored inheritance");
        self.owned_acl(benefactor_id)
    }

    /// Move a node into the trash can. The whole subtree is governed by the trash root until the
    /// node is restored, ACLs inside the subtree are kept.
    pub fn trash_node(&self, user: &UserInfo, id: NodeId) -> Result<(), AuthError> {
        let node = self.require_node(id)?;
        if node.parent_id.is_none() {
            return Err(AuthError::IllegalArgument(format!(
                "root {id} can not be trashed"
            )));
        }

        self.entities
            .can_access(user, id, AccessType::Delete)?
            .check()?;

        let trash_root_id = self.config.trash_root_id;
        self.store.set_parent(id, trash_root_id, node.etag)?;
        self.inheritance
            .force_node_parent_changed(id, trash_root_id)?;

        debug!(node = %id, user = %user.id, "moved node to trash");
        Ok(())
    }

    /// Move a trashed node below a new parent. Nodes of the subtree owning an ACL govern
    /// themselves again, all others inherit.
    pub fn restore_node(
        &self,
        user: &UserInfo,
        id: NodeId,
        parent_id: NodeId,
    ) -> Result<(), AuthError> {
        let node = self.require_node(id)?;
        if node.parent_id != Some(self.config.trash_root_id) {
            return Err(AuthError::IllegalArgument(format!(
                "entity {id} is not in the trash can"
            )));
        }

        self.entities
            .can_create(user, Some(parent_id), node.entity_type)?
            .check()?;

        let owns_acl = self.store.get_acl(&Resource::Entity(id))?.is_some();
        if self.config.is_root(parent_id) && !owns_acl {
            return Err(AuthError::IllegalArgument(format!(
                "entity {id} needs its own ACL to be restored below a root"
            )));
        }

        self.store.set_parent(id, parent_id, node.etag)?;

        let benefactor_id = if owns_acl {
            id
        } else {
            self.store.get_benefactor(parent_id)?
        };
        let mut updates = vec![(id, benefactor_id)];
        self.collect_restored(id, benefactor_id, &mut updates)?;
        self.store.set_all(&updates)?;

        debug!(node = %id, parent = %parent_id, count = updates.len(), "restored node from trash");
        Ok(())
    }

    /// Move a node below another parent.
    ///
    /// Requires UPDATE on the node, CREATE on the new parent and that the node does not lose
    /// any of the access requirements restricting it. Moves out of or into the trash can go
    /// through [`PermissionsManager::restore_node`] and [`PermissionsManager::trash_node`].
    pub fn move_node(
        &self,
        user: &UserInfo,
        id: NodeId,
        parent_id: NodeId,
    ) -> Result<Node, AuthError> {
        let node = self.require_node(id)?;
        let Some(current_parent_id) = node.parent_id else {
            return Err(AuthError::IllegalArgument(format!(
                "root {id} can not be moved"
            )));
        };

        if current_parent_id == parent_id {
            return Ok(node);
        }

        if self.inheritance.is_node_in_trash(id)? {
            return Err(AuthError::IllegalArgument(format!(
                "entity {id} is in the trash can and can only be restored"
            )));
        }
        if self.inheritance.is_node_in_trash(parent_id)? {
            return Err(AuthError::IllegalArgument(format!(
                "entity {id} can only be moved into the trash can by trashing it"
            )));
        }

        self.entities
            .can_access(user, id, AccessType::Update)?
            .check()?;
        self.entities
            .can_create(user, Some(parent_id), node.entity_type)?
            .check()?;
        can_user_move_restricted_entity(
            &self.store,
            &self.config,
            user,
            current_parent_id,
            parent_id,
        )?
        .check()?;

        if self.config.is_root(parent_id) && self.store.get_benefactor(id)? != id {
            return Err(AuthError::IllegalArgument(format!(
                "entity {id} needs its own ACL to be moved below a root"
            )));
        }

        let node = self.store.set_parent(id, parent_id, node.etag)?;
        self.inheritance.node_parent_changed(id, parent_id)?;

        debug!(node = %id, parent = %parent_id, user = %user.id, "moved node");
        Ok(node)
    }

    pub fn inheritance(&self) -> &InheritanceManager<S> {
        &self.inheritance
    }

    fn require_node(&self, id: NodeId) -> Result<Node, AuthError> {
        self.store
            .get_node(id)?
            .ok_or_else(|| AuthError::NotFound(format!("entity {id}")))
    }

    fn owned_acl(&self, id: NodeId) -> Result<Acl, AuthError> {
        self.store
            .get_acl(&Resource::Entity(id))?
            .ok_or_else(|| AuthError::NotFound(format!("ACL of entity {id}")))
    }

    fn collect_restored(
        &self,
        id: NodeId,
        benefactor_id: NodeId,
        updates: &mut Vec<(NodeId, NodeId)>,
    ) -> Result<(), AuthError> {
        let mut stack: Vec<(NodeId, NodeId)> = self
            .store
            .get_children(id)?
            .into_iter()
            .map(|child_id| (child_id, benefactor_id))
            .collect();

        while let Some((child_id, inherited)) = stack.pop() {
            let benefactor_id = if self.store.get_acl(&Resource::Entity(child_id))?.is_some() {
                child_id
            } else {
                inherited
            };

            updates.push((child_id, benefactor_id));
            stack.extend(
                self.store
                    .get_children(child_id)?
                    .into_iter()
                    .map(|grandchild_id| (grandchild_id, benefactor_id)),
            );
        }

        Ok(())
    }
}

/// Check an ACL before it is stored.
///
/// Besides being well-formed, users who are neither admins nor the owner of the entity must not
/// take away their own permission to change permissions.
pub fn validate_acl_content(
    acl: &Acl,
    user: &UserInfo,
    owner_id: PrincipalId,
) -> Result<(), AuthError> {
    acl.validate()?;

    if user.is_admin || user.id == owner_id {
        return Ok(());
    }

    let keeps_change_permissions = acl.resource_access.iter().any(|entry| {
        entry.principal_id == Some(user.id)
            && entry.access_types.contains(&AccessType::ChangePermissions)
    });
    if !keeps_change_permissions {
        return Err(AuthError::InvalidModel(
            "caller is trying to revoke their own ACL editing permissions".into(),
        ));
    }

    Ok(())
}

/// Decide whether a restricted entity may be moved from one parent to another.
///
/// A move is only allowed when every access requirement restricting the source also restricts
/// the destination. Admins, members of the access and compliance team and moves within the same
/// parent are always allowed.
pub fn can_user_move_restricted_entity<S>(
    store: &S,
    config: &Config,
    user: &UserInfo,
    source_parent_id: NodeId,
    destination_parent_id: NodeId,
) -> Result<AuthorizationStatus, AuthError>
where
    S: Store,
{
    if config.is_act_member_or_admin(user) || source_parent_id == destination_parent_id {
        return Ok(AuthorizationStatus::authorized());
    }

    if lost_restrictions(store, source_parent_id, destination_parent_id)?.is_empty() {
        Ok(AuthorizationStatus::authorized())
    } else {
        Ok(AuthorizationStatus::not_allowed(
            "cannot move restricted entity to a location having fewer access restrictions",
        ))
    }
}

fn entity_of(acl: &Acl) -> Result<NodeId, AuthError> {
    match acl.owner {
        Resource::Entity(id) => Ok(id),
        other => Err(AuthError::IllegalArgument(format!(
            "{other} is not an entity"
        ))),
    }
}
