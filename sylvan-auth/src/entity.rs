// SPDX-License-Identifier: MIT OR Apache-2.0

//! Access decisions on entities of the hierarchy.
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use sylvan_core::{
    AccessType, DataType, EntityType, Node, NodeId, PrincipalId, RequirementId, Resource,
    RestrictableObject, UserInfo,
};
use sylvan_store::Store;
use tracing::trace;

use crate::decider::{
    AccessContext, CAN_DELETE_ACL, Decider, EntityState, chain_for, make_access_decision,
};
use crate::requirements::unmet_requirements;
use crate::{AuthError, AuthorizationStatus, Config};

/// What a user may do with an entity, as shown next to it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntityPermissions {
    pub can_add_child: bool,
    pub can_certified_user_add_child: bool,
    pub can_edit: bool,
    pub can_certified_user_edit: bool,
    pub can_view: bool,
    pub can_download: bool,
    pub can_upload: bool,
    pub can_delete: bool,
    pub can_change_permissions: bool,
    pub can_change_settings: bool,
    pub can_move: bool,
    pub can_moderate: bool,
    pub can_public_read: bool,
    pub can_enable_inheritance: bool,
    pub owner_principal_id: PrincipalId,
    pub is_certified_user: bool,
    pub is_certification_required: bool,
    pub is_entity_open_data: bool,
}

/// Entities split by whether a user may read them, both in the order they were given.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Visibility {
    pub visible: Vec<NodeId>,
    pub hidden: Vec<NodeId>,
}

#[derive(Clone, Debug)]
pub struct EntityAuthorization<S> {
    store: S,
    config: Config,
}

impl<S> EntityAuthorization<S>
where
    S: Store,
{
    pub fn new(store: S, config: Config) -> Self {
        Self { store, config }
    }

    /// Decide whether the user may perform the access type on the entity.
    ///
    /// Admins are authorized for everything, even for entities which do not exist. For everyone
    /// else an unknown entity is an error.
    pub fn can_access(
        &self,
        user: &UserInfo,
        id: NodeId,
        access_type: AccessType,
    ) -> Result<AuthorizationStatus, AuthError> {
        if user.is_admin {
            return Ok(AuthorizationStatus::authorized());
        }

        let state = self.state(user, id, access_type == AccessType::Download)?;
        let status = self.decide(user, &state, access_type, None, chain_for(access_type));
        if let Some(denial) = status.denial() {
            trace!(user = %user.id, entity = %id, %access_type, %denial, "access denied");
        }
        Ok(status)
    }

    /// All access types have to be authorized, the first denial is returned.
    pub fn has_access(
        &self,
        user: &UserInfo,
        id: NodeId,
        access_types: &[AccessType],
    ) -> Result<AuthorizationStatus, AuthError> {
        for access_type in access_types {
            let status = self.can_access(user, id, *access_type)?;
            if !status.is_authorized() {
                return Ok(status);
            }
        }
        Ok(AuthorizationStatus::authorized())
    }

    /// Decide whether the user may create an entity of the given type below the parent.
    pub fn can_create(
        &self,
        user: &UserInfo,
        parent_id: Option<NodeId>,
        entity_type: EntityType,
    ) -> Result<AuthorizationStatus, AuthError> {
        if user.is_admin {
            return Ok(AuthorizationStatus::authorized());
        }

        let Some(parent_id) = parent_id else {
            return Ok(AuthorizationStatus::not_allowed(
                "cannot create an entity having no parent",
            ));
        };

        let state = self.state(user, parent_id, false)?;
        Ok(self.decide(
            user,
            &state,
            AccessType::Create,
            Some(entity_type),
            chain_for(AccessType::Create),
        ))
    }

    /// Decide whether the user may delete the ACL of the entity so it inherits again.
    pub fn can_delete_acl(
        &self,
        user: &UserInfo,
        id: NodeId,
    ) -> Result<AuthorizationStatus, AuthError> {
        let state = self.state(user, id, false)?;
        Ok(self.decide(
            user,
            &state,
            AccessType::ChangePermissions,
            None,
            CAN_DELETE_ACL,
        ))
    }

    pub fn user_permissions(
        &self,
        user: &UserInfo,
        id: NodeId,
    ) -> Result<UserEntityPermissions, AuthError> {
        let state = self.state(user, id, true)?;
        let allowed = |access_type: AccessType| {
            self.decide(user, &state, access_type, None, chain_for(access_type))
                .is_authorized()
        };

        let can_edit = allowed(AccessType::Update);
        let can_change_permissions = allowed(AccessType::ChangePermissions);
        let is_anonymous = self.config.is_anonymous(user);

        Ok(UserEntityPermissions {
            can_add_child: allowed(AccessType::Create),
            can_certified_user_add_child: user.is_admin
                || state.granted.contains(&AccessType::Create),
            can_edit,
            can_certified_user_edit: user.is_admin || state.granted.contains(&AccessType::Update),
            can_view: allowed(AccessType::Read),
            can_download: allowed(AccessType::Download),
            can_upload: !is_anonymous,
            can_delete: allowed(AccessType::Delete),
            can_change_permissions,
            can_change_settings: allowed(AccessType::ChangeSettings),
            can_move: can_edit && can_change_permissions,
            can_moderate: allowed(AccessType::Moderate),
            can_public_read: state.public_read,
            can_enable_inheritance: self
                .decide(
                    user,
                    &state,
                    AccessType::ChangePermissions,
                    None,
                    CAN_DELETE_ACL,
                )
                .is_authorized(),
            owner_principal_id: state.created_by,
            is_certified_user: self.config.is_certified(user),
            is_certification_required: self.config.require_certification,
            is_entity_open_data: state.data_type == DataType::OpenData,
        })
    }

    /// Download requirements on the entity or its ancestors the user has not met yet.
    pub fn unmet_requirements(
        &self,
        user: &UserInfo,
        id: NodeId,
    ) -> Result<Vec<RequirementId>, AuthError> {
        self.require_node(id)?;
        unmet_requirements(
            &self.store,
            &self.config,
            user,
            &RestrictableObject::Entity(id),
            AccessType::Download,
        )
    }

    /// The candidate benefactors whose ACL lets the user read. The trash root is never included.
    pub fn get_accessible_benefactors(
        &self,
        user: &UserInfo,
        candidates: &BTreeSet<NodeId>,
    ) -> Result<BTreeSet<NodeId>, AuthError> {
        let mut candidates = candidates.clone();
        candidates.remove(&self.config.trash_root_id);

        if user.is_admin {
            return Ok(candidates);
        }

        Ok(self
            .store
            .get_accessible_benefactors(&user.groups, &candidates, AccessType::Read)?)
    }

    /// Split entities into the ones the user may read and the ones hidden from them, deciding
    /// once per distinct benefactor.
    pub fn filter_visible(&self, user: &UserInfo, ids: &[NodeId]) -> Result<Visibility, AuthError> {
        let benefactors: BTreeMap<NodeId, NodeId> = self.store.get_benefactors(ids)?;
        let candidates: BTreeSet<NodeId> = benefactors.values().copied().collect();
        let accessible = self.get_accessible_benefactors(user, &candidates)?;

        let mut visibility = Visibility::default();
        for id in ids {
            let visible = benefactors
                .get(id)
                .is_some_and(|benefactor_id| accessible.contains(benefactor_id));
            if visible {
                visibility.visible.push(*id);
            } else {
                visibility.hidden.push(*id);
            }
        }

        trace!(
            user = %user.id,
            benefactors = candidates.len(),
            visible = visibility.visible.len(),
            hidden = visibility.hidden.len(),
            "filtered entities"
        );
        Ok(visibility)
    }

    fn decide(
        &self,
        user: &UserInfo,
        state: &EntityState,
        access_type: AccessType,
        create_type: Option<EntityType>,
        chain: &[Decider],
    ) -> AuthorizationStatus {
        let ctx = AccessContext {
            user,
            config: &self.config,
            state,
            access_type,
            create_type,
        };
        make_access_decision(&ctx, chain)
    }

    fn require_node(&self, id: NodeId) -> Result<Node, AuthError> {
        self.store
            .get_node(id)?
            .ok_or_else(|| AuthError::NotFound(format!("entity {id}")))
    }

    /// Gather everything the deciders need. Requirements are only looked up when asked for.
    fn state(
        &self,
        user: &UserInfo,
        id: NodeId,
        with_requirements: bool,
    ) -> Result<EntityState, AuthError> {
        let node = self.require_node(id)?;
        let benefactor_id = self.store.get_benefactor(id)?;

        let (granted, public_read) = match self.store.get_acl(&Resource::Entity(benefactor_id))? {
            Some(acl) => (
                acl.access_types_for(&user.groups),
                acl.permits(&self.config.anonymous_user().groups, AccessType::Read),
            ),
            None => (BTreeSet::new(), false),
        };

        let in_trash = benefactor_id == self.config.trash_root_id;
        let unmet_requirements = if with_requirements {
            unmet_requirements(
                &self.store,
                &self.config,
                user,
                &RestrictableObject::Entity(id),
                AccessType::Download,
            )?
        } else {
            Vec::new()
        };

        Ok(EntityState {
            entity_id: id,
            entity_type: node.entity_type,
            data_type: node.data_type,
            created_by: node.created_by,
            parent_id: node.parent_id,
            benefactor_id,
            parent_is_root: node
                .parent_id
                .is_none_or(|parent_id| self.config.is_root(parent_id)),
            in_trash,
            granted,
            public_read: public_read && !in_trash,
            unmet_requirements,
        })
    }
}
