// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{ApprovalId, Etag, PrincipalId, RequirementId, Timestamp};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalState {
    Approved,
    Revoked,
}

/// Evidence that an accessor satisfied one version of an access requirement.
///
/// The submitter is the principal who asked for access (on behalf of themselves and possibly
/// other accessors), all approvals created for the same request share a submitter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessApproval {
    pub id: ApprovalId,
    pub requirement_id: RequirementId,
    pub requirement_version: u64,
    pub submitter_id: PrincipalId,
    pub accessor_id: PrincipalId,
    pub state: ApprovalState,
    pub expired_on: Option<Timestamp>,
    pub created_by: PrincipalId,
    pub created_on: Timestamp,
    pub modified_on: Timestamp,
    pub revoked_by: Option<PrincipalId>,
    pub etag: Etag,
}

impl AccessApproval {
    pub fn new(
        id: ApprovalId,
        requirement_id: RequirementId,
        requirement_version: u64,
        submitter_id: PrincipalId,
        accessor_id: PrincipalId,
        created_by: PrincipalId,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            requirement_id,
            requirement_version,
            submitter_id,
            accessor_id,
            state: ApprovalState::Approved,
            expired_on: None,
            created_by,
            created_on: now,
            modified_on: now,
            revoked_by: None,
            etag: Etag::default(),
        }
    }

    pub fn with_expired_on(mut self, expired_on: Option<Timestamp>) -> Self {
        self.expired_on = expired_on;
        self
    }

    pub fn is_revoked(&self) -> bool {
        self.state == ApprovalState::Revoked
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expired_on.is_some_and(|expired_on| expired_on <= now)
    }

    /// An approval counts towards a requirement when it is neither revoked nor expired and was
    /// granted for the current version of the requirement. Superseded versions are accepted when
    /// `accept_superseded` is set.
    pub fn is_valid(&self, current_version: u64, now: Timestamp, accept_superseded: bool) -> bool {
        if self.is_revoked() || self.is_expired(now) {
            return false;
        }

        if accept_superseded {
            self.requirement_version <= current_version
        } else {
            self.requirement_version == current_version
        }
    }

    pub fn revoke(&mut self, revoked_by: PrincipalId) {
        self.state = ApprovalState::Revoked;
        self.revoked_by = Some(revoked_by);
        self.modified_on = Timestamp::now();
        self.etag = self.etag.next();
    }
}

/// Approved accessors of one requirement who were granted access through the same submitter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessorGroup {
    pub requirement_id: RequirementId,
    pub submitter_id: PrincipalId,
    pub accessor_ids: BTreeSet<PrincipalId>,

    /// Earliest expiry of the approvals in the group, `None` if none of them expires.
    pub expired_on: Option<Timestamp>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessorGroupFilter {
    pub requirement_id: Option<RequirementId>,
    pub submitter_id: Option<PrincipalId>,
    pub accessor_id: Option<PrincipalId>,

    /// Only groups expiring strictly before this time. Groups without expiry never match.
    pub expire_before: Option<Timestamp>,
}

impl AccessorGroupFilter {
    pub fn matches(&self, group: &AccessorGroup) -> bool {
        if self
            .requirement_id
            .is_some_and(|requirement_id| requirement_id != group.requirement_id)
        {
            return false;
        }

        if self
            .submitter_id
            .is_some_and(|submitter_id| submitter_id != group.submitter_id)
        {
            return false;
        }

        if self
            .accessor_id
            .is_some_and(|accessor_id| !group.accessor_ids.contains(&accessor_id))
        {
            return false;
        }

        match (self.expire_before, group.expired_on) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(expire_before), Some(expired_on)) => expired_on < expire_before,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use crate::{
        AccessApproval, AccessorGroup, AccessorGroupFilter, ApprovalId, PrincipalId,
        RequirementId, Timestamp,
    };

    fn approval(version: u64) -> AccessApproval {
        AccessApproval::new(
            ApprovalId::new(1),
            RequirementId::new(7),
            version,
            PrincipalId::new(10),
            PrincipalId::new(10),
            PrincipalId::new(10),
        )
    }

    #[test]
    fn validity() {
        let now = Timestamp::new(1_000);

        let current = approval(3);
        assert!(current.is_valid(3, now, false));

        let superseded = approval(2);
        assert!(!superseded.is_valid(3, now, false));
        assert!(superseded.is_valid(3, now, true));

        let expired = approval(3).with_expired_on(Some(Timestamp::new(1_000)));
        assert!(expired.is_expired(now));
        assert!(!expired.is_valid(3, now, false));

        let running = approval(3).with_expired_on(Some(Timestamp::new(1_001)));
        assert!(running.is_valid(3, now, false));

        let mut revoked = approval(3);
        revoked.revoke(PrincipalId::new(99));
        assert!(!revoked.is_valid(3, now, true));
        assert_eq!(revoked.revoked_by, Some(PrincipalId::new(99)));
    }

    #[test]
    fn group_filter() {
        let group = AccessorGroup {
            requirement_id: RequirementId::new(7),
            submitter_id: PrincipalId::new(10),
            accessor_ids: BTreeSet::from([PrincipalId::new(10), PrincipalId::new(11)]),
            expired_on: Some(Timestamp::new(500)),
        };

        assert!(AccessorGroupFilter::default().matches(&group));
        assert!(
            AccessorGroupFilter {
                accessor_id: Some(PrincipalId::new(11)),
                expire_before: Some(Timestamp::new(501)),
                ..Default::default()
            }
            .matches(&group)
        );
        assert!(
            !AccessorGroupFilter {
                expire_before: Some(Timestamp::new(500)),
                ..Default::default()
            }
            .matches(&group)
        );
        assert!(
            !AccessorGroupFilter {
                submitter_id: Some(PrincipalId::new(11)),
                ..Default::default()
            }
            .matches(&group)
        );

        let unlimited = AccessorGroup {
            expired_on: None,
            ..group
        };
        assert!(
            !AccessorGroupFilter {
                expire_before: Some(Timestamp::new(u64::MAX)),
                ..Default::default()
            }
            .matches(&unlimited)
        );
    }
}
