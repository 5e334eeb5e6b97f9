// SPDX-License-Identifier: MIT OR Apache-2.0

//! Governance of access requirements and the approvals satisfying them.
//!
//! Users sign terms of use themselves. Everything else (approving data access submissions,
//! revoking approvals of others, managing requirements) is done by the access and compliance
//! team (ACT) or admins.
use sylvan_core::{
    AccessApproval, AccessRequirement, AccessorGroup, AccessorGroupFilter, ApprovalId,
    PrincipalId, RequirementId, Timestamp, UserInfo,
};
use sylvan_store::Store;
use tracing::debug;

use crate::{AuthError, AuthorizationStatus, Config, Denial};

/// Approval to create. Version and submitter are taken from the requirement and the accessor
/// when not given.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApprovalRequest {
    pub requirement_id: RequirementId,
    pub requirement_version: Option<u64>,
    pub accessor_id: PrincipalId,
    pub submitter_id: Option<PrincipalId>,
    pub expired_on: Option<Timestamp>,
}

impl ApprovalRequest {
    pub fn new(requirement_id: RequirementId, accessor_id: PrincipalId) -> Self {
        Self {
            requirement_id,
            requirement_version: None,
            accessor_id,
            submitter_id: None,
            expired_on: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ApprovalManager<S> {
    store: S,
    config: Config,
}

impl<S> ApprovalManager<S>
where
    S: Store,
{
    pub fn new(store: S, config: Config) -> Self {
        Self { store, config }
    }

    /// Whether the user may create the approval.
    ///
    /// Terms of use are accepted by the accessor themselves, all other approvals are granted by
    /// the ACT. Lock requirements can not be approved.
    pub fn can_create_access_approval(
        &self,
        user: &UserInfo,
        requirement: &AccessRequirement,
        accessor_id: PrincipalId,
    ) -> Result<AuthorizationStatus, AuthError> {
        if requirement.is_lock() {
            return Err(AuthError::IllegalArgument(format!(
                "access requirement {} is a lock and can not be approved",
                requirement.id
            )));
        }

        if accessor_id == self.config.principals.anonymous_user_id {
            return Err(AuthError::IllegalArgument(
                "the anonymous user can not be granted access approvals".into(),
            ));
        }

        if self.config.is_act_member_or_admin(user)
            || (requirement.is_terms_of_use() && accessor_id == user.id)
        {
            Ok(AuthorizationStatus::authorized())
        } else {
            Ok(AuthorizationStatus::denied(Denial::NotActMember))
        }
    }

    pub fn create_approval(
        &self,
        user: &UserInfo,
        request: ApprovalRequest,
    ) -> Result<AccessApproval, AuthError> {
        let requirement = self.require_requirement(request.requirement_id)?;

        // Terms of use are always signed for oneself.
        let accessor_id = if requirement.is_terms_of_use() {
            user.id
        } else {
            request.accessor_id
        };

        self.can_create_access_approval(user, &requirement, accessor_id)?
            .check()?;

        if let Some(version) = request
            .requirement_version
            .filter(|version| *version > requirement.version)
        {
            return Err(AuthError::IllegalArgument(format!(
                "access requirement {} has no version {version}",
                requirement.id
            )));
        }

        let approval = AccessApproval::new(
            ApprovalId::new(0),
            requirement.id,
            request.requirement_version.unwrap_or(requirement.version),
            request.submitter_id.unwrap_or(accessor_id),
            accessor_id,
            user.id,
        )
        .with_expired_on(request.expired_on);

        let approval = self.store.create_or_update_approval(approval)?;
        debug!(
            approval = %approval.id,
            requirement = %requirement.id,
            accessor = %accessor_id,
            by = %user.id,
            "created access approval"
        );
        Ok(approval)
    }

    /// Grant a managed requirement to all accessors of an approved submission. Approvals expire
    /// after the requirement's expiration period, renewing supersedes the previous approvals.
    pub fn approve_submission(
        &self,
        user: &UserInfo,
        requirement_id: RequirementId,
        submitter_id: PrincipalId,
        accessor_ids: &[PrincipalId],
    ) -> Result<Vec<AccessApproval>, AuthError> {
        self.require_act(user)?;

        let requirement = self.require_requirement(requirement_id)?;
        if !requirement.is_managed() {
            return Err(AuthError::IllegalArgument(format!(
                "access requirement {requirement_id} is not managed by the ACT"
            )));
        }

        let expired_on = requirement
            .expiration_period()
            .map(|period| Timestamp::now() + period);

        if accessor_ids.contains(&self.config.principals.anonymous_user_id) {
            return Err(AuthError::IllegalArgument(
                "the anonymous user can not be granted access approvals".into(),
            ));
        }

        let mut approvals = Vec::with_capacity(accessor_ids.len());
        for accessor_id in accessor_ids {
            let approval = AccessApproval::new(
                ApprovalId::new(0),
                requirement.id,
                requirement.version,
                submitter_id,
                *accessor_id,
                user.id,
            )
            .with_expired_on(expired_on);
            approvals.push(self.store.create_or_update_approval(approval)?);
        }

        debug!(
            requirement = %requirement_id,
            submitter = %submitter_id,
            count = approvals.len(),
            "approved submission"
        );
        Ok(approvals)
    }

    /// Revoke all approvals of a requirement held by an accessor. Accessors may revoke their own
    /// approvals.
    pub fn revoke_approvals(
        &self,
        user: &UserInfo,
        requirement_id: RequirementId,
        accessor_id: PrincipalId,
    ) -> Result<Vec<ApprovalId>, AuthError> {
        if user.id != accessor_id {
            self.require_act(user)?;
        }

        let ids: Vec<ApprovalId> = self
            .store
            .list_by_accessor(requirement_id, accessor_id)?
            .into_iter()
            .map(|approval| approval.id)
            .collect();

        let revoked = self.store.revoke_batch(&ids, user.id)?;
        debug!(
            requirement = %requirement_id,
            accessor = %accessor_id,
            count = revoked.len(),
            "revoked access approvals"
        );
        Ok(revoked)
    }

    /// Revoke the approvals of all accessors of one submitter.
    pub fn revoke_group(
        &self,
        user: &UserInfo,
        requirement_id: RequirementId,
        submitter_id: PrincipalId,
    ) -> Result<Vec<ApprovalId>, AuthError> {
        self.require_act(user)?;

        let ids: Vec<ApprovalId> = self
            .store
            .list_by_submitter(requirement_id, submitter_id)?
            .into_iter()
            .map(|approval| approval.id)
            .collect();

        let revoked = self.store.revoke_batch(&ids, user.id)?;
        debug!(
            requirement = %requirement_id,
            submitter = %submitter_id,
            count = revoked.len(),
            "revoked accessor group"
        );
        Ok(revoked)
    }

    pub fn list_accessor_groups(
        &self,
        user: &UserInfo,
        filter: &AccessorGroupFilter,
    ) -> Result<Vec<AccessorGroup>, AuthError> {
        self.require_act(user)?;
        Ok(self.store.list_accessor_groups(filter)?)
    }

    /// Revoke up to `max_batch` approvals which expired by now.
    pub fn revoke_expired_approvals(
        &self,
        user: &UserInfo,
        max_batch: usize,
    ) -> Result<Vec<ApprovalId>, AuthError> {
        self.require_act(user)?;
        if max_batch == 0 {
            return Err(AuthError::IllegalArgument(
                "the batch size must be greater than zero".into(),
            ));
        }

        let expired = self.store.list_expired(Timestamp::now(), max_batch)?;
        if expired.is_empty() {
            return Ok(expired);
        }

        let revoked = self.store.revoke_batch(&expired, user.id)?;
        debug!(count = revoked.len(), "revoked expired access approvals");
        Ok(revoked)
    }

    pub fn create_requirement(
        &self,
        user: &UserInfo,
        requirement: AccessRequirement,
    ) -> Result<AccessRequirement, AuthError> {
        self.require_act(user)?;
        if requirement.subjects.is_empty() {
            return Err(AuthError::IllegalArgument(
                "access requirements need at least one subject".into(),
            ));
        }

        let requirement = self.store.create_requirement(AccessRequirement {
            created_by: user.id,
            ..requirement
        })?;
        debug!(requirement = %requirement.id, "created access requirement");
        Ok(requirement)
    }

    /// Replace a requirement, its version is incremented. Approvals for the previous version no
    /// longer satisfy it unless superseded approvals are accepted.
    pub fn update_requirement(
        &self,
        user: &UserInfo,
        requirement: AccessRequirement,
    ) -> Result<AccessRequirement, AuthError> {
        self.require_act(user)?;
        let requirement = self.store.update_requirement(requirement)?;
        debug!(
            requirement = %requirement.id,
            version = requirement.version,
            "updated access requirement"
        );
        Ok(requirement)
    }

    pub fn delete_requirement(
        &self,
        user: &UserInfo,
        requirement_id: RequirementId,
    ) -> Result<(), AuthError> {
        self.require_act(user)?;
        if !self.store.delete_requirement(requirement_id)? {
            return Err(AuthError::NotFound(format!(
                "access requirement {requirement_id}"
            )));
        }
        debug!(requirement = %requirement_id, "deleted access requirement");
        Ok(())
    }

    fn require_act(&self, user: &UserInfo) -> Result<(), AuthError> {
        if self.config.is_act_member_or_admin(user) {
            Ok(())
        } else {
            AuthorizationStatus::denied(Denial::NotActMember).check()
        }
    }

    fn require_requirement(&self, id: RequirementId) -> Result<AccessRequirement, AuthError> {
        self.store
            .get_requirement(id)?
            .ok_or_else(|| AuthError::NotFound(format!("access requirement {id}")))
    }
}
