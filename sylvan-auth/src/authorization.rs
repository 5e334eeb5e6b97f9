// SPDX-License-Identifier: MIT OR Apache-2.0

//! Access decisions on every kind of resource.
use std::collections::BTreeSet;

use sylvan_core::{
    AccessType, EntityType, NodeId, ObjectType, PrincipalId, RequirementId, Resource,
    RestrictableObject, UserInfo,
};
use sylvan_store::{MembershipInvitation, MembershipRequest, Store};
use tracing::trace;

use crate::entity::{EntityAuthorization, UserEntityPermissions, Visibility};
use crate::requirements::unmet_requirements;
use crate::{AuthError, AuthorizationStatus, Config, Denial, permissions};

#[derive(Clone, Debug)]
pub struct AuthorizationManager<S> {
    pub(crate) store: S,
    pub(crate) config: Config,
    pub(crate) entities: EntityAuthorization<S>,
}

impl<S> AuthorizationManager<S>
where
    S: Store + Clone,
{
    pub fn new(store: S, config: Config) -> Self {
        Self {
            entities: EntityAuthorization::new(store.clone(), config.clone()),
            store,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Decide whether the user may perform the access type on a resource.
    ///
    /// Admins may do everything. The anonymous user may never do more than read and download.
    pub fn can_access(
        &self,
        user: &UserInfo,
        resource: &Resource,
        access_type: AccessType,
    ) -> Result<AuthorizationStatus, AuthError> {
        if user.is_admin {
            return Ok(AuthorizationStatus::authorized());
        }

        if self.config.is_anonymous(user)
            && !matches!(access_type, AccessType::Read | AccessType::Download)
        {
            return Ok(AuthorizationStatus::denied(Denial::Anonymous));
        }

        let status = match resource {
            Resource::Entity(id) => return self.entities.can_access(user, *id, access_type),
            Resource::Evaluation(_) | Resource::Team(_) => {
                self.can_access_restrictable(user, resource, access_type)?
            }
            Resource::AccessRequirement(id) => {
                if self.store.get_requirement(*id)?.is_none() {
                    return Err(AuthError::NotFound(format!("access requirement {id}")));
                }

                if self.config.is_act_member_or_admin(user) || access_type == AccessType::Download
                {
                    AuthorizationStatus::authorized()
                } else {
                    AuthorizationStatus::denied(Denial::NotActMember)
                }
            }
            Resource::AccessApproval(id) => {
                if self.store.get_approval(*id)?.is_none() {
                    return Err(AuthError::NotFound(format!("access approval {id}")));
                }

                if access_type == AccessType::Read && self.config.is_act_member_or_admin(user) {
                    AuthorizationStatus::authorized()
                } else {
                    AuthorizationStatus::denied(Denial::NotActMember)
                }
            }
            Resource::MembershipInvitation(id) => {
                let MembershipInvitation {
                    team_id,
                    invitee_id,
                } = self
                    .store
                    .get_invitation(*id)?
                    .ok_or_else(|| AuthError::NotFound(format!("membership invitation {id}")))?;

                let invitee = user.id == invitee_id
                    && matches!(access_type, AccessType::Read | AccessType::Delete);
                let team_admin = matches!(
                    access_type,
                    AccessType::Create | AccessType::Read | AccessType::Delete
                ) && self.is_team_admin(user, team_id)?;
                (invitee || team_admin).into()
            }
            Resource::MembershipRequest(id) => {
                let MembershipRequest { team_id, user_id } = self
                    .store
                    .get_membership_request(*id)?
                    .ok_or_else(|| AuthError::NotFound(format!("membership request {id}")))?;

                let requester = user.id == user_id
                    && matches!(
                        access_type,
                        AccessType::Create | AccessType::Read | AccessType::Delete
                    );
                let team_admin = matches!(access_type, AccessType::Read | AccessType::Delete)
                    && self.is_team_admin(user, team_id)?;
                (requester || team_admin).into()
            }
            Resource::Message(id) => {
                if access_type != AccessType::Download {
                    return Ok(download_only(resource));
                }

                let participants = self
                    .store
                    .get_message_participants(*id)?
                    .ok_or_else(|| AuthError::NotFound(format!("message {id}")))?;
                let is_participant = participants.sender_id == user.id
                    || participants
                        .recipient_ids
                        .iter()
                        .any(|recipient_id| user.is_member_of(*recipient_id));
                if is_participant {
                    AuthorizationStatus::authorized()
                } else {
                    AuthorizationStatus::not_allowed("only the sender and recipients may download")
                }
            }
            Resource::EvaluationSubmissions(id) => {
                if access_type != AccessType::Download {
                    return Ok(download_only(resource));
                }

                self.acl_decision(
                    user,
                    &Resource::Evaluation(*id),
                    AccessType::ReadPrivateSubmission,
                )?
            }
            Resource::DataAccessRequest(_) | Resource::DataAccessSubmission(_) => {
                if access_type != AccessType::Download {
                    return Ok(download_only(resource));
                }

                if self.config.is_act_member_or_admin(user) {
                    AuthorizationStatus::authorized()
                } else {
                    AuthorizationStatus::denied(Denial::NotActMember)
                }
            }
            Resource::UserProfile(_) => {
                if access_type != AccessType::Download {
                    return Ok(download_only(resource));
                }

                AuthorizationStatus::authorized()
            }
            Resource::Wiki(id) => {
                if access_type != AccessType::Download {
                    return Ok(download_only(resource));
                }

                let owner = self
                    .store
                    .get_wiki_owner(*id)?
                    .ok_or_else(|| AuthError::NotFound(format!("wiki {id}")))?;
                match owner {
                    // Wikis of access requirements explain them and are public.
                    Resource::AccessRequirement(_) => AuthorizationStatus::authorized(),
                    owner => self.can_access(user, &owner, AccessType::Read)?,
                }
            }
            Resource::VerificationSubmission(id) => {
                if access_type != AccessType::Download {
                    return Ok(download_only(resource));
                }

                let submitter_id = self
                    .store
                    .get_verification_submitter(*id)?
                    .ok_or_else(|| AuthError::NotFound(format!("verification submission {id}")))?;
                if submitter_id == user.id || self.config.is_act_member_or_admin(user) {
                    AuthorizationStatus::authorized()
                } else {
                    AuthorizationStatus::denied(Denial::NotActMember)
                }
            }
        };

        if let Some(denial) = status.denial() {
            trace!(user = %user.id, %resource, %access_type, %denial, "access denied");
        }
        Ok(status)
    }

    /// Resolve a principal through the principal directory.
    ///
    /// Principals the directory flags as anonymous act as the anonymous user.
    pub fn user_info(&self, principal_id: PrincipalId) -> Result<UserInfo, AuthError> {
        if self.store.is_anonymous(principal_id)? {
            return Ok(self.config.anonymous_user());
        }

        Ok(self.store.get_user_info(principal_id)?)
    }

    /// Like [`AuthorizationManager::can_access`] for a principal known only by its identifier.
    pub fn can_access_as(
        &self,
        principal_id: PrincipalId,
        resource: &Resource,
        access_type: AccessType,
    ) -> Result<AuthorizationStatus, AuthError> {
        let user = self.user_info(principal_id)?;
        self.can_access(&user, resource, access_type)
    }

    /// Like [`AuthorizationManager::can_access`] for a resource given by type and identifier.
    pub fn can_access_by_id(
        &self,
        user: &UserInfo,
        object_type: ObjectType,
        id: &str,
        access_type: AccessType,
    ) -> Result<AuthorizationStatus, AuthError> {
        let resource = Resource::parse(object_type, id)?;
        self.can_access(user, &resource, access_type)
    }

    pub fn can_create(
        &self,
        user: &UserInfo,
        parent_id: Option<NodeId>,
        entity_type: EntityType,
    ) -> Result<AuthorizationStatus, AuthError> {
        self.entities.can_create(user, parent_id, entity_type)
    }

    pub fn has_access(
        &self,
        user: &UserInfo,
        id: NodeId,
        access_types: &[AccessType],
    ) -> Result<AuthorizationStatus, AuthError> {
        self.entities.has_access(user, id, access_types)
    }

    pub fn user_permissions(
        &self,
        user: &UserInfo,
        id: NodeId,
    ) -> Result<UserEntityPermissions, AuthError> {
        self.entities.user_permissions(user, id)
    }

    /// Download requirements on the entity or its ancestors the user has not met yet.
    pub fn unmet_requirements(
        &self,
        user: &UserInfo,
        id: NodeId,
    ) -> Result<Vec<RequirementId>, AuthError> {
        self.entities.unmet_requirements(user, id)
    }

    pub fn can_user_move_restricted_entity(
        &self,
        user: &UserInfo,
        source_parent_id: NodeId,
        destination_parent_id: NodeId,
    ) -> Result<AuthorizationStatus, AuthError> {
        permissions::can_user_move_restricted_entity(
            &self.store,
            &self.config,
            user,
            source_parent_id,
            destination_parent_id,
        )
    }

    /// Subset of the candidate benefactors the user may read. Only entities have benefactors.
    pub fn get_accessible_benefactors(
        &self,
        user: &UserInfo,
        object_type: ObjectType,
        candidates: &BTreeSet<NodeId>,
    ) -> Result<BTreeSet<NodeId>, AuthError> {
        if object_type != ObjectType::Entity {
            return Err(AuthError::IllegalArgument(format!(
                "{object_type} resources have no benefactors"
            )));
        }

        self.entities.get_accessible_benefactors(user, candidates)
    }

    pub fn filter_visible(&self, user: &UserInfo, ids: &[NodeId]) -> Result<Visibility, AuthError> {
        self.entities.filter_visible(user, ids)
    }

    /// Reading the approvals of a subject is reserved to the access and compliance team, team
    /// admins may also read the approvals of their team.
    pub fn can_access_approvals_for_subject(
        &self,
        user: &UserInfo,
        subject: &RestrictableObject,
        access_type: AccessType,
    ) -> Result<AuthorizationStatus, AuthError> {
        if access_type != AccessType::Read {
            return Err(AuthError::IllegalArgument(format!(
                "approvals of a subject can not be accessed for {access_type}"
            )));
        }

        if self.config.is_act_member_or_admin(user) {
            return Ok(AuthorizationStatus::authorized());
        }

        if let RestrictableObject::Team(team_id) = subject {
            if self.is_team_admin(user, *team_id)? {
                return Ok(AuthorizationStatus::authorized());
            }
        }

        Ok(AuthorizationStatus::denied(Denial::NotActMember))
    }

    pub fn can_create_access_requirement(
        &self,
        user: &UserInfo,
        _subject: &RestrictableObject,
    ) -> AuthorizationStatus {
        if self.config.is_act_member_or_admin(user) {
            AuthorizationStatus::authorized()
        } else {
            AuthorizationStatus::denied(Denial::NotActMember)
        }
    }

    pub fn is_act_member_or_admin(&self, user: &UserInfo) -> bool {
        self.config.is_act_member_or_admin(user)
    }

    /// ACL of an evaluation or a team, followed by the access requirements on it.
    fn can_access_restrictable(
        &self,
        user: &UserInfo,
        resource: &Resource,
        access_type: AccessType,
    ) -> Result<AuthorizationStatus, AuthError> {
        let subject = match resource {
            Resource::Evaluation(id) => RestrictableObject::Evaluation(*id),
            Resource::Team(id) => {
                // Team icons can be downloaded by everybody.
                if access_type == AccessType::Download {
                    return Ok(AuthorizationStatus::authorized());
                }
                RestrictableObject::Team(*id)
            }
            other => {
                return Err(AuthError::IllegalArgument(format!(
                    "{other} is not restrictable"
                )));
            }
        };

        let status = self.acl_decision(user, resource, access_type)?;
        if !status.is_authorized() {
            return Ok(status);
        }

        let unmet = unmet_requirements(&self.store, &self.config, user, &subject, access_type)?;
        if unmet.is_empty() {
            Ok(status)
        } else {
            Ok(AuthorizationStatus::denied(Denial::UnmetRequirements(
                unmet,
            )))
        }
    }

    fn acl_decision(
        &self,
        user: &UserInfo,
        owner: &Resource,
        access_type: AccessType,
    ) -> Result<AuthorizationStatus, AuthError> {
        if self.store.can_access(&user.groups, owner, access_type)? {
            Ok(AuthorizationStatus::authorized())
        } else {
            Ok(AuthorizationStatus::denied(Denial::NoAclGrant(access_type)))
        }
    }

    fn is_team_admin(&self, user: &UserInfo, team_id: PrincipalId) -> Result<bool, AuthError> {
        Ok(self.store.is_team_admin(team_id, user.id)?
            || self.store.can_access(
                &user.groups,
                &Resource::Team(team_id),
                AccessType::TeamMembershipUpdate,
            )?)
    }
}

fn download_only(resource: &Resource) -> AuthorizationStatus {
    AuthorizationStatus::not_allowed(format!(
        "only DOWNLOAD is supported for {}",
        resource.object_type()
    ))
}
