// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Etag, ModelError, NodeId, PrincipalId, Timestamp};

/// Type tag of an entity.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Project,
    Folder,
    File,
    Table,
    EntityView,
    Dataset,
    DatasetCollection,
    Link,
    DockerRepo,
    SubmissionView,
    MaterializedView,
    VirtualTable,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Project => "project",
            EntityType::Folder => "folder",
            EntityType::File => "file",
            EntityType::Table => "table",
            EntityType::EntityView => "entityview",
            EntityType::Dataset => "dataset",
            EntityType::DatasetCollection => "datasetcollection",
            EntityType::Link => "link",
            EntityType::DockerRepo => "dockerrepo",
            EntityType::SubmissionView => "submissionview",
            EntityType::MaterializedView => "materializedview",
            EntityType::VirtualTable => "virtualtable",
        }
    }
}

impl Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let entity_type = match value.to_ascii_lowercase().as_str() {
            "project" => EntityType::Project,
            "folder" => EntityType::Folder,
            "file" => EntityType::File,
            "table" => EntityType::Table,
            "entityview" => EntityType::EntityView,
            "dataset" => EntityType::Dataset,
            "datasetcollection" => EntityType::DatasetCollection,
            "link" => EntityType::Link,
            "dockerrepo" => EntityType::DockerRepo,
            "submissionview" => EntityType::SubmissionView,
            "materializedview" => EntityType::MaterializedView,
            "virtualtable" => EntityType::VirtualTable,
            _ => return Err(ModelError::UnknownEntityType(value.to_string())),
        };
        Ok(entity_type)
    }
}

/// Sensitivity classification of the data held by an entity.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    #[default]
    SensitiveData,

    /// Anyone who can read the entity may also download it.
    OpenData,
}

/// An entity in the hierarchy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,

    /// `None` only for roots.
    pub parent_id: Option<NodeId>,

    pub name: String,
    pub entity_type: EntityType,
    pub data_type: DataType,
    pub created_by: PrincipalId,
    pub created_on: Timestamp,
    pub modified_by: PrincipalId,
    pub modified_on: Timestamp,
    pub etag: Etag,
}

impl Node {
    pub fn new(
        id: NodeId,
        parent_id: Option<NodeId>,
        entity_type: EntityType,
        created_by: PrincipalId,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            parent_id,
            name: id.to_string(),
            entity_type,
            data_type: DataType::default(),
            created_by,
            created_on: now,
            modified_by: created_by,
            modified_on: now,
            etag: Etag::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_project(&self) -> bool {
        self.entity_type == EntityType::Project
    }

    pub fn is_open_data(&self) -> bool {
        self.data_type == DataType::OpenData
    }
}

#[cfg(test)]
mod tests {
    use crate::{DataType, EntityType, ModelError, Node, NodeId, PrincipalId};

    #[test]
    fn entity_type_names() {
        assert_eq!("dockerrepo".parse::<EntityType>(), Ok(EntityType::DockerRepo));
        assert_eq!("Project".parse::<EntityType>(), Ok(EntityType::Project));
        assert_eq!(
            "spreadsheet".parse::<EntityType>(),
            Err(ModelError::UnknownEntityType("spreadsheet".into()))
        );
        assert_eq!(
            serde_json::to_string(&EntityType::EntityView).unwrap(),
            "\"entityview\""
        );
    }

    #[test]
    fn builder() {
        let node = Node::new(
            NodeId::new(2),
            Some(NodeId::new(1)),
            EntityType::File,
            PrincipalId::new(5),
        )
        .with_name("data.csv")
        .with_data_type(DataType::OpenData);

        assert!(!node.is_root());
        assert!(!node.is_project());
        assert!(node.is_open_data());
        assert_eq!(node.name, "data.csv");
        assert_eq!(node.modified_by, PrincipalId::new(5));
    }
}
