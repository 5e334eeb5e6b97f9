// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use sylvan_core::{BootstrapPrincipals, NodeId, UserInfo};

/// Configuration shared by all managers of one deployment.
///
/// Missing fields take their default value when deserialising.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the entity tree, every project is a child of it.
    pub root_id: NodeId,

    /// Root of the trash can. Trashed nodes are moved below it and inherit its empty ACL.
    pub trash_root_id: NodeId,

    pub principals: BootstrapPrincipals,

    /// Only certified users may create or update anything but projects, and change settings.
    pub require_certification: bool,

    /// Approvals granted for an older version of a requirement still satisfy it.
    pub accept_superseded_approvals: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_id: NodeId::new(4489),
            trash_root_id: NodeId::new(1681355),
            principals: BootstrapPrincipals::default(),
            require_certification: false,
            accept_superseded_approvals: false,
        }
    }
}

impl Config {
    pub fn is_root(&self, id: NodeId) -> bool {
        id == self.root_id || id == self.trash_root_id
    }

    pub fn is_anonymous(&self, user: &UserInfo) -> bool {
        user.is_anonymous(&self.principals)
    }

    pub fn is_certified(&self, user: &UserInfo) -> bool {
        user.is_certified(&self.principals)
    }

    /// Admins and members of the access and compliance team govern requirements and approvals.
    pub fn is_act_member_or_admin(&self, user: &UserInfo) -> bool {
        user.is_admin || user.is_act_member(&self.principals)
    }

    /// The anonymous user as it appears when asking what the public may see.
    pub fn anonymous_user(&self) -> UserInfo {
        UserInfo::anonymous(&self.principals)
    }
}

#[cfg(test)]
mod tests {
    use sylvan_core::{NodeId, PrincipalId, UserInfo};

    use super::Config;

    #[test]
    fn partial_config() {
        let config: Config = serde_json::from_str(r#"{ "require_certification": true }"#).unwrap();
        assert!(config.require_certification);
        assert!(!config.accept_superseded_approvals);
        assert_eq!(config.root_id, Config::default().root_id);

        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(serde_json::from_str::<Config>(&json).unwrap(), config);
    }

    #[test]
    fn roots() {
        let config = Config::default();
        assert!(config.is_root(config.root_id));
        assert!(config.is_root(config.trash_root_id));
        assert!(!config.is_root(NodeId::new(1)));

        let anonymous = config.anonymous_user();
        assert!(config.is_anonymous(&anonymous));
        assert!(!config.is_act_member_or_admin(&anonymous));
        assert!(config.is_act_member_or_admin(&UserInfo::admin(
            PrincipalId::new(1),
            &config.principals
        )));
    }
}
