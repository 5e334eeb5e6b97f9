// SPDX-License-Identifier: MIT OR Apache-2.0

//! ACL inheritance and authorization decisions.
//!
//! Entities form a forest. Each entity is governed by the access control list of its
//! _benefactor_: the nearest ancestor (or the entity itself) owning an ACL. The
//! [`InheritanceManager`] keeps the materialised benefactor index consistent when entities are
//! created, moved, trashed or start and stop owning an ACL.
//!
//! On top of the ACLs, access requirements gate single access types (usually `DOWNLOAD`) until
//! the user holds a valid approval. [`AuthorizationManager::can_access`] combines both, together
//! with the rules for admins, the anonymous user and the access and compliance team, into one
//! [`AuthorizationStatus`].
//!
//! Denials are values, not errors. Errors are reserved for unknown resources, invalid input and
//! failed compare-and-set writes.
//!
//! ```
//! use sylvan_auth::{AuthorizationManager, Config, PermissionsManager};
//! use sylvan_core::{AccessType, EntityType, Node, NodeId, PrincipalId, Resource, UserInfo};
//! use sylvan_store::MemoryStore;
//!
//! # fn main() -> Result<(), sylvan_auth::AuthError> {
//! let config = Config::default();
//! let store = MemoryStore::new();
//! let permissions = PermissionsManager::new(store.clone(), config.clone());
//! let authorization = AuthorizationManager::new(store, config.clone());
//!
//! let admin = UserInfo::admin(PrincipalId::new(1), &config.principals);
//! permissions.bootstrap(admin.id)?;
//!
//! // Projects own an ACL granting their creator full control.
//! let alice = UserInfo::user(PrincipalId::new(2), &config.principals);
//! let project = Node::new(NodeId::new(10), Some(config.root_id), EntityType::Project, alice.id);
//! permissions.create_node(&alice, project)?;
//!
//! let bob = UserInfo::user(PrincipalId::new(3), &config.principals);
//! let resource = Resource::Entity(NodeId::new(10));
//! assert!(authorization.can_access(&alice, &resource, AccessType::Read)?.is_authorized());
//! assert!(!authorization.can_access(&bob, &resource, AccessType::Read)?.is_authorized());
//! # Ok(())
//! # }
//! ```
mod approvals;
mod authorization;
mod config;
pub mod decider;
mod docker;
mod entity;
mod error;
mod inheritance;
mod permissions;
mod requirements;
mod status;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use approvals::{ApprovalManager, ApprovalRequest};
pub use authorization::AuthorizationManager;
pub use config::Config;
pub use docker::{
    DockerAction, DockerResourceType, OAuthScope, REGISTRY_CATALOG, parse_docker_actions,
    parse_repository_parent,
};
pub use entity::{EntityAuthorization, UserEntityPermissions, Visibility};
pub use error::AuthError;
pub use inheritance::{InheritanceManager, Propagation};
pub use permissions::{
    AclLookup, PermissionsManager, can_user_move_restricted_entity, validate_acl_content,
};
pub use status::{AuthorizationStatus, Denial};
