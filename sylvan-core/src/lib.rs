// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data types shared by the sylvan access control stack.
//!
//! Entities are organised in a forest of trees. Every node is governed by the access control
//! list (ACL) of exactly one node, its _benefactor_, which is either the node itself (an
//! "override point") or the benefactor of its parent. On top of the ACLs, access requirements
//! can gate individual access types (usually `DOWNLOAD`) until the requesting principal holds a
//! valid access approval.
//!
//! This crate only contains the data model. Persistence interfaces live in `sylvan-store` and the
//! inheritance and authorization logic in `sylvan-auth`.
mod access;
mod acl;
mod approval;
mod error;
mod ids;
mod node;
mod principal;
mod requirement;
mod timestamp;

pub use access::{AccessType, ObjectType, Resource};
pub use acl::{Acl, Etag, ResourceAccess};
pub use approval::{AccessApproval, AccessorGroup, AccessorGroupFilter, ApprovalState};
pub use error::ModelError;
pub use ids::{
    ApprovalId, DataAccessId, EvaluationId, InvitationId, MembershipRequestId, MessageId, NodeId,
    PrincipalId, RequirementId, SubmissionId, VerificationId, WikiId,
};
pub use node::{DataType, EntityType, Node};
pub use principal::{BootstrapPrincipals, UserInfo};
pub use requirement::{AccessRequirement, RequirementKind, RestrictableObject};
pub use timestamp::Timestamp;
