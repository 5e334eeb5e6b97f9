// SPDX-License-Identifier: MIT OR Apache-2.0

//! Maintenance of the benefactor index.
//!
//! Every node is governed by the ACL of its benefactor. A node is either its own benefactor (an
//! override point owning an ACL) or shares the benefactor of its parent. Whenever a node starts
//! or stops owning an ACL, or moves below another parent, the new benefactor has to be pushed
//! down into its subtree.
//!
//! Propagation walks the subtree and by default stops at override points: their subtree is
//! governed by their own ACL and stays untouched. The forced mode walks through them and is only
//! meant for repairs and for moving subtrees into the trash can.
//!
//! All updates of one operation are collected first and then written with a single
//! [`BenefactorIndex::set_all`], so readers never see a half propagated subtree.
use sylvan_core::NodeId;
use sylvan_store::{BenefactorIndex, HierarchyStore, StoreError};
use tracing::{debug, trace};

use crate::{AuthError, Config};

/// How propagation treats override points below the changed node.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Propagation {
    /// Leave the subtrees of override points untouched.
    SkipOverrides,

    /// Overwrite every descendant, including override points.
    Force,
}

#[derive(Clone, Debug)]
pub struct InheritanceManager<S> {
    store: S,
    config: Config,
}

impl<S> InheritanceManager<S>
where
    S: HierarchyStore + BenefactorIndex,
{
    pub fn new(store: S, config: Config) -> Self {
        Self { store, config }
    }

    pub fn benefactor(&self, id: NodeId) -> Result<NodeId, AuthError> {
        Ok(self.store.get_benefactor(id)?)
    }

    /// Make the node an override point and propagate it to all descendants which are not
    /// governed by another override point.
    pub fn set_node_to_inherit_from_itself(&self, id: NodeId) -> Result<(), AuthError> {
        self.inherit_from_itself(id, Propagation::SkipOverrides)
    }

    /// Make the node an override point and the benefactor of its whole subtree.
    pub fn force_node_to_inherit_from_itself(&self, id: NodeId) -> Result<(), AuthError> {
        self.inherit_from_itself(id, Propagation::Force)
    }

    pub fn inherit_from_itself(
        &self,
        id: NodeId,
        propagation: Propagation,
    ) -> Result<(), AuthError> {
        self.require_node(id)?;

        let mut updates = vec![(id, id)];
        self.collect_descendants(id, id, propagation, &mut updates)?;

        debug!(node = %id, ?propagation, count = updates.len(), "inherit from itself");
        self.store.set_all(&updates)?;
        Ok(())
    }

    /// Stop the node from being an override point, it and the descendants it governed take the
    /// benefactor of its parent. Roots are left as they are.
    pub fn set_node_to_inherit_from_nearest_parent(&self, id: NodeId) -> Result<(), AuthError> {
        self.require_node(id)?;

        let Some(parent_id) = self.store.get_parent_id(id)? else {
            trace!(node = %id, "roots always inherit from themselves");
            return Ok(());
        };

        let benefactor_id = self.store.get_benefactor(parent_id)?;
        let mut updates = vec![(id, benefactor_id)];
        self.collect_descendants(id, benefactor_id, Propagation::SkipOverrides, &mut updates)?;

        debug!(
            node = %id,
            benefactor = %benefactor_id,
            count = updates.len(),
            "inherit from nearest parent"
        );
        self.store.set_all(&updates)?;
        Ok(())
    }

    /// Must be called after the parent of a node changed.
    ///
    /// An override point keeps governing itself and its subtree. Any other node takes the
    /// benefactor of its new parent, together with the descendants it shares its benefactor with.
    pub fn node_parent_changed(&self, id: NodeId, parent_id: NodeId) -> Result<(), AuthError> {
        self.parent_changed(id, parent_id, Propagation::SkipOverrides)
    }

    /// Give the moved node and its whole subtree the benefactor of the new parent, even when
    /// they are override points.
    pub fn force_node_parent_changed(
        &self,
        id: NodeId,
        parent_id: NodeId,
    ) -> Result<(), AuthError> {
        self.parent_changed(id, parent_id, Propagation::Force)
    }

    pub fn parent_changed(
        &self,
        id: NodeId,
        parent_id: NodeId,
        propagation: Propagation,
    ) -> Result<(), AuthError> {
        self.require_node(id)?;
        self.require_node(parent_id)?;

        if propagation == Propagation::SkipOverrides && self.is_override_point(id)? {
            trace!(node = %id, parent = %parent_id, "moved override point keeps its benefactor");
            return Ok(());
        }

        let benefactor_id = self.store.get_benefactor(parent_id)?;
        let mut updates = vec![(id, benefactor_id)];
        self.collect_descendants(id, benefactor_id, propagation, &mut updates)?;

        debug!(
            node = %id,
            parent = %parent_id,
            benefactor = %benefactor_id,
            ?propagation,
            count = updates.len(),
            "parent changed"
        );
        self.store.set_all(&updates)?;
        Ok(())
    }

    pub fn is_node_in_trash(&self, id: NodeId) -> Result<bool, AuthError> {
        Ok(self.store.get_benefactor(id)? == self.config.trash_root_id)
    }

    fn require_node(&self, id: NodeId) -> Result<(), AuthError> {
        match self.store.get_node(id)? {
            Some(_) => Ok(()),
            None => Err(AuthError::NotFound(format!("node {id}"))),
        }
    }

    /// Nodes without an index entry yet are not override points.
    fn is_override_point(&self, id: NodeId) -> Result<bool, AuthError> {
        match self.store.get_benefactor(id) {
            Ok(benefactor_id) => Ok(benefactor_id == id),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn collect_descendants(
        &self,
        id: NodeId,
        benefactor_id: NodeId,
        propagation: Propagation,
        updates: &mut Vec<(NodeId, NodeId)>,
    ) -> Result<(), AuthError> {
        let mut stack = self.store.get_children(id)?;

        while let Some(child_id) = stack.pop() {
            if propagation == Propagation::SkipOverrides && self.is_override_point(child_id)? {
                continue;
            }

            updates.push((child_id, benefactor_id));
            stack.extend(self.store.get_children(child_id)?);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use sylvan_core::{EntityType, Node, NodeId, PrincipalId};
    use sylvan_store::{BenefactorIndex, HierarchyStore, MemoryStore};

    use crate::{AuthError, Config};

    use super::InheritanceManager;

    const OWNER: PrincipalId = PrincipalId::new(1);

    fn insert(store: &MemoryStore, id: u64, parent: Option<u64>) -> NodeId {
        let id = NodeId::new(id);
        store
            .insert_node(Node::new(
                id,
                parent.map(NodeId::new),
                EntityType::Folder,
                OWNER,
            ))
            .unwrap();
        id
    }

    /// root (1)
    /// └── a (2)
    ///     ├── inherits (3)
    ///     │   └── inherits child (4)
    ///     └── override (5)
    ///         └── override child (6)
    fn tree() -> (MemoryStore, InheritanceManager<MemoryStore>) {
        let store = MemoryStore::new();
        insert(&store, 1, None);
        insert(&store, 2, Some(1));
        insert(&store, 3, Some(2));
        insert(&store, 4, Some(3));
        insert(&store, 5, Some(2));
        insert(&store, 6, Some(5));

        store
            .set_all(&[
                (NodeId::new(1), NodeId::new(1)),
                (NodeId::new(2), NodeId::new(1)),
                (NodeId::new(3), NodeId::new(1)),
                (NodeId::new(4), NodeId::new(1)),
                (NodeId::new(5), NodeId::new(5)),
                (NodeId::new(6), NodeId::new(5)),
            ])
            .unwrap();

        let manager = InheritanceManager::new(store.clone(), Config::default());
        (store, manager)
    }

    fn benefactor(store: &MemoryStore, id: u64) -> u64 {
        store.get_benefactor(NodeId::new(id)).unwrap().as_u64()
    }

    #[test]
    fn propagation_stops_at_overrides() {
        let (store, manager) = tree();

        manager
            .set_node_to_inherit_from_itself(NodeId::new(2))
            .unwrap();
        assert_eq!(benefactor(&store, 1), 1);
        assert_eq!(benefactor(&store, 2), 2);
        assert_eq!(benefactor(&store, 3), 2);
        assert_eq!(benefactor(&store, 4), 2);
        assert_eq!(benefactor(&store, 5), 5);
        assert_eq!(benefactor(&store, 6), 5);

        // Doing it again changes nothing.
        manager
            .set_node_to_inherit_from_itself(NodeId::new(2))
            .unwrap();
        assert_eq!(benefactor(&store, 4), 2);
        assert_eq!(benefactor(&store, 6), 5);
    }

    #[test]
    fn forced_propagation_overwrites_overrides() {
        let (store, manager) = tree();

        manager
            .force_node_to_inherit_from_itself(NodeId::new(2))
            .unwrap();
        for id in 2..=6 {
            assert_eq!(benefactor(&store, id), 2);
        }
    }

    #[test]
    fn restore_takes_nearest_parent() {
        let (store, manager) = tree();
        manager
            .set_node_to_inherit_from_itself(NodeId::new(2))
            .unwrap();
        manager
            .set_node_to_inherit_from_itself(NodeId::new(3))
            .unwrap();
        assert_eq!(benefactor(&store, 4), 3);

        manager
            .set_node_to_inherit_from_nearest_parent(NodeId::new(3))
            .unwrap();
        assert_eq!(benefactor(&store, 3), 2);
        assert_eq!(benefactor(&store, 4), 2);
        assert_eq!(benefactor(&store, 6), 5);

        // Roots stay their own benefactor.
        manager
            .set_node_to_inherit_from_nearest_parent(NodeId::new(1))
            .unwrap();
        assert_eq!(benefactor(&store, 1), 1);
    }

    #[test]
    fn moving_nodes() {
        let (store, manager) = tree();

        // Move the inheriting subtree below the override point.
        let node = store.get_node(NodeId::new(3)).unwrap().unwrap();
        store
            .set_parent(NodeId::new(3), NodeId::new(5), node.etag)
            .unwrap();
        manager
            .node_parent_changed(NodeId::new(3), NodeId::new(5))
            .unwrap();
        assert_eq!(benefactor(&store, 3), 5);
        assert_eq!(benefactor(&store, 4), 5);

        // Moving the override point itself keeps its benefactor.
        let node = store.get_node(NodeId::new(5)).unwrap().unwrap();
        store
            .set_parent(NodeId::new(5), NodeId::new(1), node.etag)
            .unwrap();
        manager
            .node_parent_changed(NodeId::new(5), NodeId::new(1))
            .unwrap();
        assert_eq!(benefactor(&store, 5), 5);
        assert_eq!(benefactor(&store, 3), 5);

        // Unless forced.
        manager
            .force_node_parent_changed(NodeId::new(5), NodeId::new(1))
            .unwrap();
        assert_eq!(benefactor(&store, 5), 1);
        assert_eq!(benefactor(&store, 4), 1);
    }

    #[test]
    fn unknown_nodes() {
        let (_, manager) = tree();
        assert_matches!(
            manager.set_node_to_inherit_from_itself(NodeId::new(99)),
            Err(AuthError::NotFound(_))
        );
        assert_matches!(
            manager.node_parent_changed(NodeId::new(3), NodeId::new(99)),
            Err(AuthError::NotFound(_))
        );
    }

    #[test]
    fn trash() {
        let store = MemoryStore::new();
        let config = Config::default();
        let trash = insert(&store, config.trash_root_id.as_u64(), None);
        let node = insert(&store, 10, Some(trash.as_u64()));
        store.set_all(&[(trash, trash), (node, trash)]).unwrap();

        let manager = InheritanceManager::new(store, config);
        assert!(manager.is_node_in_trash(node).unwrap());
        assert!(manager.is_node_in_trash(trash).unwrap());
    }
}
