// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::PrincipalId;

/// Well-known principals every deployment is bootstrapped with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapPrincipals {
    /// Group everybody, including anonymous users, is a member of.
    pub public_group_id: PrincipalId,

    /// Group of all users who signed in.
    pub authenticated_users_group_id: PrincipalId,

    pub anonymous_user_id: PrincipalId,
    pub certified_users_group_id: PrincipalId,

    /// Access and compliance team, governs access requirements and approvals.
    pub act_team_id: PrincipalId,
}

impl Default for BootstrapPrincipals {
    fn default() -> Self {
        Self {
            public_group_id: PrincipalId::new(273949),
            authenticated_users_group_id: PrincipalId::new(273948),
            anonymous_user_id: PrincipalId::new(273950),
            certified_users_group_id: PrincipalId::new(3),
            act_team_id: PrincipalId::new(464532),
        }
    }
}

/// A principal asking for access together with all groups it belongs to.
///
/// The groups always contain the principal's own id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: PrincipalId,
    pub is_admin: bool,
    pub groups: BTreeSet<PrincipalId>,
}

impl UserInfo {
    pub fn new(
        id: PrincipalId,
        is_admin: bool,
        groups: impl IntoIterator<Item = PrincipalId>,
    ) -> Self {
        let mut groups: BTreeSet<PrincipalId> = groups.into_iter().collect();
        groups.insert(id);
        Self {
            id,
            is_admin,
            groups,
        }
    }

    /// Signed-in user, member of the public and authenticated users groups.
    pub fn user(id: PrincipalId, principals: &BootstrapPrincipals) -> Self {
        Self::new(
            id,
            false,
            [
                principals.public_group_id,
                principals.authenticated_users_group_id,
            ],
        )
    }

    pub fn admin(id: PrincipalId, principals: &BootstrapPrincipals) -> Self {
        Self {
            is_admin: true,
            ..Self::user(id, principals)
        }
    }

    /// The anonymous user is only a member of the public group.
    pub fn anonymous(principals: &BootstrapPrincipals) -> Self {
        Self::new(
            principals.anonymous_user_id,
            false,
            [principals.public_group_id],
        )
    }

    pub fn with_group(mut self, group_id: PrincipalId) -> Self {
        self.groups.insert(group_id);
        self
    }

    pub fn is_member_of(&self, group_id: PrincipalId) -> bool {
        self.groups.contains(&group_id)
    }

    pub fn is_anonymous(&self, principals: &BootstrapPrincipals) -> bool {
        self.id == principals.anonymous_user_id
    }

    pub fn is_certified(&self, principals: &BootstrapPrincipals) -> bool {
        self.is_member_of(principals.certified_users_group_id)
    }

    pub fn is_act_member(&self, principals: &BootstrapPrincipals) -> bool {
        self.is_member_of(principals.act_team_id)
    }
}

#[cfg(test)]
mod tests {
    use crate::{BootstrapPrincipals, PrincipalId, UserInfo};

    #[test]
    fn bootstrap_memberships() {
        let principals = BootstrapPrincipals::default();

        let user = UserInfo::user(PrincipalId::new(42), &principals);
        assert!(user.is_member_of(PrincipalId::new(42)));
        assert!(user.is_member_of(principals.public_group_id));
        assert!(user.is_member_of(principals.authenticated_users_group_id));
        assert!(!user.is_anonymous(&principals));
        assert!(!user.is_certified(&principals));

        let anonymous = UserInfo::anonymous(&principals);
        assert!(anonymous.is_anonymous(&principals));
        assert_eq!(anonymous.groups.len(), 2);
        assert!(!anonymous.is_member_of(principals.authenticated_users_group_id));

        let act = UserInfo::user(PrincipalId::new(7), &principals)
            .with_group(principals.act_team_id)
            .with_group(principals.certified_users_group_id);
        assert!(act.is_act_member(&principals));
        assert!(act.is_certified(&principals));
        assert!(!act.is_admin);

        assert!(UserInfo::admin(PrincipalId::new(1), &principals).is_admin);
    }
}
