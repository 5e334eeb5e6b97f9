// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence interfaces for the sylvan access control engine and an in-memory implementation.
//!
//! The engine never owns state. It reads and mutates the entity hierarchy, the benefactor index,
//! access control lists, access requirements, approvals and principal memberships through the
//! traits in this crate. Any storage backend implementing them can be plugged in, `MemoryStore`
//! implements all of them and is used for testing and embedded setups.
//!
//! Compare-and-set writes (ACLs, requirements, node moves) fail with
//! [`StoreError::ConflictingUpdate`] when the etag of the written value does not match the stored
//! one. Callers are expected to re-read and retry, the stores never retry on their own.
pub mod memory;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
mod traits;

pub use memory::MemoryStore;
pub use traits::{
    AclStore, ApprovalStore, BenefactorIndex, HierarchyStore, MembershipInvitation,
    MembershipRequest, MessageParticipants, ObjectDirectory, PrincipalDirectory,
    RequirementStore, Store, StoreError,
};
