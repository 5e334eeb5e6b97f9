// SPDX-License-Identifier: MIT OR Apache-2.0

//! Actions a user may perform on a docker registry.
//!
//! Repositories are named `{service}/{parent}/{name}`, where the parent is the project the
//! repository entity lives in, for example `docker.synapse.org/syn123/my-repo`.
use std::collections::BTreeSet;
use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sylvan_core::{AccessType, EntityType, NodeId, Resource, UserInfo};
use sylvan_store::Store;
use tracing::{debug, trace};

use crate::{AuthError, AuthorizationManager};

/// Name of the registry resource listing all repositories.
pub const REGISTRY_CATALOG: &str = "catalog";

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DockerAction {
    Push,
    Pull,
    #[serde(rename = "*")]
    All,
}

impl DockerAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DockerAction::Push => "push",
            DockerAction::Pull => "pull",
            DockerAction::All => "*",
        }
    }
}

impl Display for DockerAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DockerAction {
    type Err = AuthError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "push" => Ok(DockerAction::Push),
            "pull" => Ok(DockerAction::Pull),
            "*" => Ok(DockerAction::All),
            other => Err(AuthError::IllegalArgument(format!(
                "unknown docker action \"{other}\""
            ))),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DockerResourceType {
    Repository,
    Registry,
}

impl FromStr for DockerResourceType {
    type Err = AuthError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "repository" => Ok(DockerResourceType::Repository),
            "registry" => Ok(DockerResourceType::Registry),
            other => Err(AuthError::IllegalArgument(format!(
                "unknown docker resource type \"{other}\""
            ))),
        }
    }
}

/// Scopes of the OAuth token a request was made with.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthScope {
    OpenId,
    View,
    Download,
    Modify,
    AuthorizeClient,
}

impl OAuthScope {
    /// Docker actions the scope allows on repositories.
    pub fn docker_actions(&self) -> &'static [DockerAction] {
        match self {
            OAuthScope::Download => &[DockerAction::Pull],
            OAuthScope::Modify => &[DockerAction::Push, DockerAction::Pull],
            OAuthScope::OpenId | OAuthScope::View | OAuthScope::AuthorizeClient => &[],
        }
    }
}

impl FromStr for OAuthScope {
    type Err = AuthError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "openid" => Ok(OAuthScope::OpenId),
            "view" => Ok(OAuthScope::View),
            "download" => Ok(OAuthScope::Download),
            "modify" => Ok(OAuthScope::Modify),
            "authorize" => Ok(OAuthScope::AuthorizeClient),
            other => Err(AuthError::IllegalArgument(format!(
                "unknown oauth scope \"{other}\""
            ))),
        }
    }
}

/// Parse a comma separated list of actions like `push,pull`.
pub fn parse_docker_actions(csv: &str) -> Result<BTreeSet<DockerAction>, AuthError> {
    let actions = csv
        .split(',')
        .map(str::trim)
        .filter(|action| !action.is_empty())
        .map(DockerAction::from_str)
        .collect::<Result<BTreeSet<_>, _>>()?;

    if actions.is_empty() {
        return Err(AuthError::IllegalArgument(
            "no docker actions requested".into(),
        ));
    }

    Ok(actions)
}

/// Parent entity named by the first segment of a repository path like `syn123/my-repo`.
pub fn parse_repository_parent(path: &str) -> Option<NodeId> {
    let mut segments = path.split('/');
    let parent = segments.next()?;
    let rest: Vec<&str> = segments.collect();
    if rest.is_empty() || rest.iter().any(|segment| segment.is_empty()) {
        return None;
    }

    NodeId::from_str(parent).ok()
}

impl<S> AuthorizationManager<S>
where
    S: Store + Clone,
{
    /// The project a repository path refers to, `None` if the path does not start with the id
    /// of an existing project.
    pub fn valid_docker_repository_parent_id(
        &self,
        path: &str,
    ) -> Result<Option<NodeId>, AuthError> {
        let Some(parent_id) = parse_repository_parent(path) else {
            return Ok(None);
        };

        Ok(self
            .store
            .get_node(parent_id)?
            .filter(|node| node.entity_type == EntityType::Project)
            .map(|node| node.id))
    }

    /// The requested actions the user may perform on a docker repository or registry.
    ///
    /// On repositories, only actions allowed by one of the OAuth scopes are permitted. Listing
    /// the registry catalog is reserved to admins holding the `view` scope.
    pub fn permitted_docker_actions(
        &self,
        user: &UserInfo,
        scopes: &[OAuthScope],
        service: &str,
        resource_type: DockerResourceType,
        name: &str,
        requested_actions: &str,
    ) -> Result<BTreeSet<DockerAction>, AuthError> {
        if service.is_empty() {
            return Err(AuthError::IllegalArgument("service is required".into()));
        }
        if name.is_empty() {
            return Err(AuthError::IllegalArgument(
                "repository path is required".into(),
            ));
        }
        let requested = parse_docker_actions(requested_actions)?;

        let permitted = match resource_type {
            DockerResourceType::Registry => {
                if name == REGISTRY_CATALOG
                    && user.is_admin
                    && scopes.contains(&OAuthScope::View)
                    && requested.contains(&DockerAction::All)
                {
                    BTreeSet::from([DockerAction::All])
                } else {
                    BTreeSet::new()
                }
            }
            DockerResourceType::Repository => {
                let allowed: BTreeSet<DockerAction> = scopes
                    .iter()
                    .flat_map(|scope| scope.docker_actions().iter().copied())
                    .collect();

                self.permitted_repository_actions(user, service, name, &requested)?
                    .intersection(&allowed)
                    .copied()
                    .collect()
            }
        };

        debug!(
            user = %user.id,
            repository = name,
            ?requested,
            ?permitted,
            "docker authorization"
        );
        Ok(permitted)
    }

    fn permitted_repository_actions(
        &self,
        user: &UserInfo,
        service: &str,
        path: &str,
        requested: &BTreeSet<DockerAction>,
    ) -> Result<BTreeSet<DockerAction>, AuthError> {
        let Some(parent_id) = self.valid_docker_repository_parent_id(path)? else {
            trace!(path, "no project for docker repository");
            return Ok(BTreeSet::new());
        };

        let repository_name = format!("{service}/{path}");
        let mut permitted = BTreeSet::new();

        let Some(repository_id) = self.store.get_docker_repository(&repository_name)? else {
            // A new repository is created by pushing to it.
            if self
                .can_create(user, Some(parent_id), EntityType::DockerRepo)?
                .is_authorized()
            {
                permitted.extend(
                    requested
                        .iter()
                        .filter(|action| matches!(action, DockerAction::Push | DockerAction::Pull)),
                );
            }
            return Ok(permitted);
        };

        // Trashed repositories can only be pulled by reviewers of evaluations they were submitted
        // to, admins included.
        if self.store.get_benefactor(repository_id)? == self.config.trash_root_id {
            if requested.contains(&DockerAction::Pull)
                && self.can_read_submitted_repository(user, repository_id)?
            {
                permitted.insert(DockerAction::Pull);
            }
            return Ok(permitted);
        }

        if requested.contains(&DockerAction::Pull)
            && (self
                .entities
                .can_access(user, repository_id, AccessType::Download)?
                .is_authorized()
                || self.can_read_submitted_repository(user, repository_id)?)
        {
            permitted.insert(DockerAction::Pull);
        }

        if requested.contains(&DockerAction::Push)
            && self
                .entities
                .can_access(user, repository_id, AccessType::Update)?
                .is_authorized()
        {
            permitted.insert(DockerAction::Push);
        }

        Ok(permitted)
    }

    /// Reviewers of an evaluation may pull the repositories submitted to it, even from the trash.
    fn can_read_submitted_repository(
        &self,
        user: &UserInfo,
        repository_id: NodeId,
    ) -> Result<bool, AuthError> {
        for evaluation_id in self.store.get_docker_submissions(repository_id)? {
            if self.store.can_access(
                &user.groups,
                &Resource::Evaluation(evaluation_id),
                AccessType::ReadPrivateSubmission,
            )? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
