// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gating of access types by access requirements.
use std::collections::BTreeSet;

use sylvan_core::{AccessType, NodeId, RequirementId, RestrictableObject, Timestamp, UserInfo};
use sylvan_store::{ApprovalStore, RequirementStore};

use crate::{AuthError, Config};

/// Requirements gating the access type on the subject which the user holds no valid approval
/// for. Lock requirements can never be met.
pub fn unmet_requirements<S>(
    store: &S,
    config: &Config,
    user: &UserInfo,
    subject: &RestrictableObject,
    access_type: AccessType,
) -> Result<Vec<RequirementId>, AuthError>
where
    S: RequirementStore + ApprovalStore,
{
    let now = Timestamp::now();
    let mut unmet = Vec::new();

    for requirement in store.get_applicable_requirements(subject, access_type)? {
        if requirement.is_lock() {
            unmet.push(requirement.id);
            continue;
        }

        let met = store
            .list_by_accessor(requirement.id, user.id)?
            .iter()
            .any(|approval| {
                approval.is_valid(
                    requirement.version,
                    now,
                    config.accept_superseded_approvals,
                )
            });
        if !met {
            unmet.push(requirement.id);
        }
    }

    Ok(unmet)
}

/// Requirements restricting the source parent which would not restrict the destination.
pub fn lost_restrictions<S>(
    store: &S,
    source_parent_id: NodeId,
    destination_parent_id: NodeId,
) -> Result<BTreeSet<RequirementId>, AuthError>
where
    S: RequirementStore,
{
    let ids = |id: NodeId| -> Result<BTreeSet<RequirementId>, AuthError> {
        Ok(store
            .get_applicable_requirements(&RestrictableObject::Entity(id), AccessType::Download)?
            .into_iter()
            .map(|requirement| requirement.id)
            .collect())
    };

    let source = ids(source_parent_id)?;
    let destination = ids(destination_parent_id)?;
    Ok(source.difference(&destination).copied().collect())
}
