// SPDX-License-Identifier: MIT OR Apache-2.0

//! Access decisions on entities as ordered chains of small rules.
//!
//! Every rule looks at the [`AccessContext`] and either decides (grant or deny) or passes on to
//! the next one. The first decision wins, a chain running out of rules denies.
use std::collections::BTreeSet;

use sylvan_core::{AccessType, DataType, EntityType, NodeId, PrincipalId, RequirementId, UserInfo};

use crate::{AuthorizationStatus, Config, Denial};

/// Everything known about an entity when deciding on access to it, gathered once per request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityState {
    pub entity_id: NodeId,
    pub entity_type: EntityType,
    pub data_type: DataType,
    pub created_by: PrincipalId,
    pub parent_id: Option<NodeId>,
    pub benefactor_id: NodeId,

    /// The parent is missing, the root or the trash root.
    pub parent_is_root: bool,

    pub in_trash: bool,

    /// Access types the benefactor's ACL grants to any of the user's groups.
    pub granted: BTreeSet<AccessType>,

    /// Whether the anonymous user may read the entity.
    pub public_read: bool,

    /// Download requirements the user has no valid approval for. Only gathered when needed.
    pub unmet_requirements: Vec<RequirementId>,
}

pub struct AccessContext<'a> {
    pub user: &'a UserInfo,
    pub config: &'a Config,
    pub state: &'a EntityState,
    pub access_type: AccessType,

    /// Type of the child about to be created, for CREATE decisions.
    pub create_type: Option<EntityType>,
}

impl AccessContext<'_> {
    fn has(&self, access_type: AccessType) -> bool {
        self.state.granted.contains(&access_type)
    }

    fn requires_certification(&self) -> bool {
        self.config.require_certification && !self.config.is_certified(self.user)
    }
}

pub type Decider = fn(&AccessContext<'_>) -> Option<AuthorizationStatus>;

pub fn grant_if_admin(ctx: &AccessContext<'_>) -> Option<AuthorizationStatus> {
    ctx.user.is_admin.then(AuthorizationStatus::authorized)
}

pub fn deny_if_in_trash(ctx: &AccessContext<'_>) -> Option<AuthorizationStatus> {
    ctx.state
        .in_trash
        .then(|| AuthorizationStatus::denied(Denial::InTrash(ctx.state.entity_id)))
}

pub fn deny_if_anonymous(ctx: &AccessContext<'_>) -> Option<AuthorizationStatus> {
    ctx.config
        .is_anonymous(ctx.user)
        .then(|| AuthorizationStatus::denied(Denial::Anonymous))
}

pub fn deny_if_not_certified(ctx: &AccessContext<'_>) -> Option<AuthorizationStatus> {
    ctx.requires_certification()
        .then(|| AuthorizationStatus::denied(Denial::NotCertified))
}

pub fn deny_if_not_project_and_not_certified(
    ctx: &AccessContext<'_>,
) -> Option<AuthorizationStatus> {
    (ctx.state.entity_type != EntityType::Project && ctx.requires_certification())
        .then(|| AuthorizationStatus::denied(Denial::NotCertified))
}

/// Without a known child type the child is treated like any other non-project.
pub fn deny_if_create_type_not_project_and_not_certified(
    ctx: &AccessContext<'_>,
) -> Option<AuthorizationStatus> {
    (ctx.create_type != Some(EntityType::Project) && ctx.requires_certification())
        .then(|| AuthorizationStatus::denied(Denial::NotCertified))
}

pub fn deny_if_parent_is_root_or_none(ctx: &AccessContext<'_>) -> Option<AuthorizationStatus> {
    ctx.state.parent_is_root.then(|| {
        AuthorizationStatus::not_allowed(
            "cannot restore inheritance for a resource which has no parent or whose parent is a root",
        )
    })
}

pub fn grant_if_creator(ctx: &AccessContext<'_>) -> Option<AuthorizationStatus> {
    (ctx.state.created_by == ctx.user.id).then(AuthorizationStatus::authorized)
}

pub fn grant_if_has_access(ctx: &AccessContext<'_>) -> Option<AuthorizationStatus> {
    ctx.has(ctx.access_type).then(AuthorizationStatus::authorized)
}

/// Open data can be downloaded by everybody who may read it.
pub fn deny_if_lacks_download(ctx: &AccessContext<'_>) -> Option<AuthorizationStatus> {
    let open_data = ctx.state.data_type == DataType::OpenData;
    if ctx.has(AccessType::Download) || (open_data && ctx.has(AccessType::Read)) {
        return None;
    }

    let missing = if open_data {
        AccessType::Read
    } else {
        AccessType::Download
    };
    Some(AuthorizationStatus::denied(Denial::NoAclGrant(missing)))
}

pub fn deny_if_unmet_requirements(ctx: &AccessContext<'_>) -> Option<AuthorizationStatus> {
    (!ctx.state.unmet_requirements.is_empty()).then(|| {
        AuthorizationStatus::denied(Denial::UnmetRequirements(
            ctx.state.unmet_requirements.clone(),
        ))
    })
}

pub fn grant(_: &AccessContext<'_>) -> Option<AuthorizationStatus> {
    Some(AuthorizationStatus::authorized())
}

pub fn deny(ctx: &AccessContext<'_>) -> Option<AuthorizationStatus> {
    Some(AuthorizationStatus::denied(Denial::NoAclGrant(ctx.access_type)))
}

const READ: &[Decider] = &[grant_if_admin, deny_if_in_trash, grant_if_has_access, deny];

const DOWNLOAD: &[Decider] = &[
    grant_if_admin,
    deny_if_in_trash,
    deny_if_lacks_download,
    deny_if_unmet_requirements,
    grant,
];

const UPDATE: &[Decider] = &[
    grant_if_admin,
    deny_if_in_trash,
    deny_if_anonymous,
    deny_if_not_project_and_not_certified,
    grant_if_has_access,
    deny,
];

const CREATE: &[Decider] = &[
    grant_if_admin,
    deny_if_in_trash,
    deny_if_anonymous,
    deny_if_create_type_not_project_and_not_certified,
    grant_if_has_access,
    deny,
];

const CHANGE_SETTINGS: &[Decider] = &[
    grant_if_admin,
    deny_if_in_trash,
    deny_if_anonymous,
    deny_if_not_certified,
    grant_if_creator,
    grant_if_has_access,
    deny,
];

/// DELETE, CHANGE_PERMISSIONS, MODERATE and every other access type.
const DEFAULT: &[Decider] = &[
    grant_if_admin,
    deny_if_in_trash,
    deny_if_anonymous,
    grant_if_has_access,
    deny,
];

/// Whether the user may delete the entity's ACL and let it inherit from its parent again.
pub const CAN_DELETE_ACL: &[Decider] = &[
    deny_if_in_trash,
    deny_if_parent_is_root_or_none,
    grant_if_admin,
    deny_if_anonymous,
    grant_if_has_access,
    deny,
];

pub fn chain_for(access_type: AccessType) -> &'static [Decider] {
    match access_type {
        AccessType::Read => READ,
        AccessType::Download => DOWNLOAD,
        AccessType::Update => UPDATE,
        AccessType::Create => CREATE,
        AccessType::ChangeSettings => CHANGE_SETTINGS,
        _ => DEFAULT,
    }
}

pub fn make_access_decision(ctx: &AccessContext<'_>, chain: &[Decider]) -> AuthorizationStatus {
    chain
        .iter()
        .find_map(|decider| decider(ctx))
        .unwrap_or_else(|| AuthorizationStatus::denied(Denial::NoAclGrant(ctx.access_type)))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use sylvan_core::{
        AccessType, DataType, EntityType, NodeId, PrincipalId, RequirementId, UserInfo,
    };

    use crate::{Config, Denial};

    use super::{AccessContext, CAN_DELETE_ACL, EntityState, chain_for, make_access_decision};

    fn state(granted: impl IntoIterator<Item = AccessType>) -> EntityState {
        EntityState {
            entity_id: NodeId::new(10),
            entity_type: EntityType::Folder,
            data_type: DataType::SensitiveData,
            created_by: PrincipalId::new(1),
            parent_id: Some(NodeId::new(5)),
            benefactor_id: NodeId::new(5),
            parent_is_root: false,
            in_trash: false,
            granted: granted.into_iter().collect(),
            public_read: false,
            unmet_requirements: Vec::new(),
        }
    }

    fn decide(
        user: &UserInfo,
        config: &Config,
        state: &EntityState,
        access_type: AccessType,
    ) -> Option<Denial> {
        let ctx = AccessContext {
            user,
            config,
            state,
            access_type,
            create_type: None,
        };
        make_access_decision(&ctx, chain_for(access_type))
            .denial()
            .cloned()
    }

    #[test]
    fn grants_follow_acl() {
        let config = Config::default();
        let user = UserInfo::user(PrincipalId::new(2), &config.principals);
        let state = state([AccessType::Read, AccessType::Update]);

        assert_eq!(decide(&user, &config, &state, AccessType::Read), None);
        assert_eq!(decide(&user, &config, &state, AccessType::Update), None);
        assert_eq!(
            decide(&user, &config, &state, AccessType::Delete),
            Some(Denial::NoAclGrant(AccessType::Delete))
        );
        assert_eq!(
            decide(&user, &config, &state, AccessType::Download),
            Some(Denial::NoAclGrant(AccessType::Download))
        );
    }

    #[test]
    fn trash_and_admin() {
        let config = Config::default();
        let user = UserInfo::user(PrincipalId::new(2), &config.principals);
        let admin = UserInfo::admin(PrincipalId::new(3), &config.principals);
        let mut state = state(AccessType::entity_admin());
        state.in_trash = true;

        for access_type in AccessType::ALL {
            assert_eq!(decide(&admin, &config, &state, *access_type), None);
            assert_eq!(
                decide(&user, &config, &state, *access_type),
                Some(Denial::InTrash(NodeId::new(10)))
            );
        }
    }

    #[test]
    fn anonymous_may_only_read() {
        let config = Config::default();
        let anonymous = config.anonymous_user();
        let state = state(AccessType::entity_admin());

        assert_eq!(decide(&anonymous, &config, &state, AccessType::Read), None);
        assert_eq!(decide(&anonymous, &config, &state, AccessType::Download), None);
        for access_type in [
            AccessType::Create,
            AccessType::Update,
            AccessType::Delete,
            AccessType::ChangePermissions,
            AccessType::ChangeSettings,
        ] {
            assert_eq!(
                decide(&anonymous, &config, &state, access_type),
                Some(Denial::Anonymous)
            );
        }
    }

    #[test]
    fn download_rules() {
        let config = Config::default();
        let user = UserInfo::user(PrincipalId::new(2), &config.principals);

        let mut open = state([AccessType::Read]);
        open.data_type = DataType::OpenData;
        assert_eq!(decide(&user, &config, &open, AccessType::Download), None);

        let mut closed = state([]);
        closed.data_type = DataType::OpenData;
        assert_eq!(
            decide(&user, &config, &closed, AccessType::Download),
            Some(Denial::NoAclGrant(AccessType::Read))
        );

        let mut gated = state([AccessType::Download]);
        gated.unmet_requirements = vec![RequirementId::new(7)];
        assert_matches!(
            decide(&user, &config, &gated, AccessType::Download),
            Some(Denial::UnmetRequirements(ids)) if ids == vec![RequirementId::new(7)]
        );
    }

    #[test]
    fn certification() {
        let config = Config {
            require_certification: true,
            ..Config::default()
        };
        let user = UserInfo::user(PrincipalId::new(2), &config.principals);
        let certified = user.clone().with_group(config.principals.certified_users_group_id);

        let folder = state(AccessType::entity_admin());
        assert_eq!(
            decide(&user, &config, &folder, AccessType::Update),
            Some(Denial::NotCertified)
        );
        assert_eq!(decide(&certified, &config, &folder, AccessType::Update), None);

        let mut project = folder.clone();
        project.entity_type = EntityType::Project;
        assert_eq!(decide(&user, &config, &project, AccessType::Update), None);

        // The creator may change settings without an explicit grant.
        let mut own = state([]);
        own.created_by = certified.id;
        assert_eq!(
            decide(&certified, &config, &own, AccessType::ChangeSettings),
            None
        );
        assert_eq!(
            decide(&user, &config, &own, AccessType::ChangeSettings),
            Some(Denial::NotCertified)
        );
    }

    #[test]
    fn delete_acl_needs_non_root_parent() {
        let config = Config::default();
        let admin = UserInfo::admin(PrincipalId::new(3), &config.principals);
        let mut state = state([AccessType::ChangePermissions]);
        state.parent_is_root = true;

        let ctx = AccessContext {
            user: &admin,
            config: &config,
            state: &state,
            access_type: AccessType::ChangePermissions,
            create_type: None,
        };
        assert_matches!(
            make_access_decision(&ctx, CAN_DELETE_ACL).denial(),
            Some(Denial::NotAllowed(_))
        );

        let user = UserInfo::user(PrincipalId::new(2), &config.principals);
        state.parent_is_root = false;
        let ctx = AccessContext {
            user: &user,
            config: &config,
            state: &state,
            access_type: AccessType::ChangePermissions,
            create_type: None,
        };
        assert!(make_access_decision(&ctx, CAN_DELETE_ACL).is_authorized());
    }
}
