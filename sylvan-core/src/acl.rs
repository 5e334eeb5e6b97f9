// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::{BTreeSet, HashSet};
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{AccessType, ModelError, PrincipalId, Resource, Timestamp};

/// Concurrency token of a mutable record.
///
/// Writers pass the etag they read and the store rejects the write when it changed in the
/// meantime.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Etag(u64);

impl Etag {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl Display for Etag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Access types granted to one principal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAccess {
    /// Required. Left optional so malformed input can be represented and rejected by
    /// [`Acl::validate`].
    pub principal_id: Option<PrincipalId>,
    pub access_types: BTreeSet<AccessType>,
}

impl ResourceAccess {
    pub fn new(
        principal_id: PrincipalId,
        access_types: impl IntoIterator<Item = AccessType>,
    ) -> Self {
        Self {
            principal_id: Some(principal_id),
            access_types: access_types.into_iter().collect(),
        }
    }
}

/// Access control list owned by an entity, evaluation or team.
///
/// Entity ACLs only exist on benefactors. Every entry grants a set of access types to a user or
/// group, a principal is permitted an access type when any of its groups is.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acl {
    pub owner: Resource,
    pub resource_access: Vec<ResourceAccess>,
    pub created_by: PrincipalId,
    pub modified_on: Timestamp,
    pub etag: Etag,
}

impl Acl {
    pub fn new(owner: Resource, created_by: PrincipalId) -> Self {
        Self {
            owner,
            resource_access: Vec::new(),
            created_by,
            modified_on: Timestamp::now(),
            etag: Etag::default(),
        }
    }

    pub fn with_access(
        mut self,
        principal_id: PrincipalId,
        access_types: impl IntoIterator<Item = AccessType>,
    ) -> Self {
        self.grant(principal_id, access_types);
        self
    }

    /// Adds access types to the entry of a principal, creating the entry if missing.
    pub fn grant(
        &mut self,
        principal_id: PrincipalId,
        access_types: impl IntoIterator<Item = AccessType>,
    ) {
        match self
            .resource_access
            .iter_mut()
            .find(|entry| entry.principal_id == Some(principal_id))
        {
            Some(entry) => entry.access_types.extend(access_types),
            None => self
                .resource_access
                .push(ResourceAccess::new(principal_id, access_types)),
        }
    }

    /// Removes the entry of a principal. Returns `false` if there was none.
    pub fn remove_principal(&mut self, principal_id: PrincipalId) -> bool {
        let before = self.resource_access.len();
        self.resource_access
            .retain(|entry| entry.principal_id != Some(principal_id));
        before != self.resource_access.len()
    }

    /// Union of all access types granted to any of the given groups.
    pub fn access_types_for(&self, groups: &BTreeSet<PrincipalId>) -> BTreeSet<AccessType> {
        self.resource_access
            .iter()
            .filter(|entry| {
                entry
                    .principal_id
                    .is_some_and(|principal_id| groups.contains(&principal_id))
            })
            .flat_map(|entry| entry.access_types.iter().copied())
            .collect()
    }

    pub fn permits(&self, groups: &BTreeSet<PrincipalId>, access_type: AccessType) -> bool {
        self.resource_access.iter().any(|entry| {
            entry
                .principal_id
                .is_some_and(|principal_id| groups.contains(&principal_id))
                && entry.access_types.contains(&access_type)
        })
    }

    pub fn principals(&self) -> impl Iterator<Item = PrincipalId> + '_ {
        self.resource_access
            .iter()
            .filter_map(|entry| entry.principal_id)
    }

    /// Checks the list is well-formed: every entry names a principal and no principal appears
    /// twice. Only entities, evaluations and teams own ACLs.
    pub fn validate(&self) -> Result<(), ModelError> {
        if !matches!(
            self.owner,
            Resource::Entity(_) | Resource::Evaluation(_) | Resource::Team(_)
        ) {
            return Err(ModelError::InvalidAclOwner(self.owner.to_string()));
        }

        let mut seen = HashSet::new();
        for entry in &self.resource_access {
            let Some(principal_id) = entry.principal_id else {
                return Err(ModelError::MissingPrincipal(self.owner.to_string()));
            };
            if !seen.insert(principal_id) {
                return Err(ModelError::DuplicatePrincipal(
                    self.owner.to_string(),
                    principal_id.as_u64(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use crate::{
        AccessType, Acl, ModelError, NodeId, PrincipalId, Resource, ResourceAccess, WikiId,
    };

    fn entity_acl() -> Acl {
        Acl::new(Resource::Entity(NodeId::new(10)), PrincipalId::new(1))
    }

    #[test]
    fn groups_are_ored() {
        let acl = entity_acl()
            .with_access(PrincipalId::new(100), [AccessType::Read])
            .with_access(PrincipalId::new(200), [AccessType::Download, AccessType::Update]);

        let groups = BTreeSet::from([
            PrincipalId::new(5),
            PrincipalId::new(100),
            PrincipalId::new(200),
        ]);
        assert!(acl.permits(&groups, AccessType::Read));
        assert!(acl.permits(&groups, AccessType::Download));
        assert!(!acl.permits(&groups, AccessType::Delete));
        assert_eq!(
            acl.access_types_for(&groups),
            BTreeSet::from([AccessType::Read, AccessType::Download, AccessType::Update])
        );

        let outsider = BTreeSet::from([PrincipalId::new(5)]);
        assert!(acl.access_types_for(&outsider).is_empty());
    }

    #[test]
    fn grant_merges_entries() {
        let mut acl = entity_acl().with_access(PrincipalId::new(3), [AccessType::Read]);
        acl.grant(PrincipalId::new(3), [AccessType::Download]);

        assert_eq!(acl.resource_access.len(), 1);
        assert!(acl.validate().is_ok());
        assert!(acl.remove_principal(PrincipalId::new(3)));
        assert!(!acl.remove_principal(PrincipalId::new(3)));
    }

    #[test]
    fn validation() {
        let mut acl = entity_acl();
        acl.resource_access.push(ResourceAccess {
            principal_id: None,
            access_types: BTreeSet::from([AccessType::Read]),
        });
        assert_eq!(
            acl.validate(),
            Err(ModelError::MissingPrincipal("ENTITY syn10".into()))
        );

        let mut acl = entity_acl();
        acl.resource_access
            .push(ResourceAccess::new(PrincipalId::new(3), [AccessType::Read]));
        acl.resource_access
            .push(ResourceAccess::new(PrincipalId::new(3), [AccessType::Update]));
        assert_eq!(
            acl.validate(),
            Err(ModelError::DuplicatePrincipal("ENTITY syn10".into(), 3))
        );

        let acl = Acl::new(Resource::Wiki(WikiId::new(9)), PrincipalId::new(1));
        assert!(matches!(acl.validate(), Err(ModelError::InvalidAclOwner(_))));
    }
}
