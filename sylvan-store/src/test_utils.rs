// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generators for randomised hierarchies.
use rand::Rng;
use sylvan_core::{EntityType, Node, NodeId, PrincipalId};

use crate::{HierarchyStore, MemoryStore, StoreError};

/// Insert `size` nodes with ids starting at `first_id` below `root`, each one attached to a
/// random node inserted before it.
///
/// Returns the new ids in insertion order, parents always come before their children.
pub fn random_hierarchy(
    store: &MemoryStore,
    rng: &mut impl Rng,
    root: NodeId,
    first_id: u64,
    size: usize,
    owner: PrincipalId,
) -> Result<Vec<NodeId>, StoreError> {
    let mut candidates = vec![root];
    let mut inserted = Vec::with_capacity(size);

    for offset in 0..size as u64 {
        let id = NodeId::new(first_id + offset);
        let parent_id = candidates[rng.random_range(0..candidates.len())];
        let entity_type = if parent_id == root {
            EntityType::Project
        } else if rng.random_bool(0.7) {
            EntityType::Folder
        } else {
            EntityType::File
        };

        store.insert_node(Node::new(id, Some(parent_id), entity_type, owner))?;
        candidates.push(id);
        inserted.push(id);
    }

    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use sylvan_core::{EntityType, Node, NodeId, PrincipalId};

    use crate::HierarchyStore;
    use crate::MemoryStore;

    use super::random_hierarchy;

    #[test]
    fn parents_come_first() {
        let store = MemoryStore::new();
        let root = NodeId::new(1);
        store
            .insert_node(Node::new(root, None, EntityType::Folder, PrincipalId::new(1)))
            .unwrap();

        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let ids = random_hierarchy(&store, &mut rng, root, 100, 50, PrincipalId::new(1)).unwrap();
        assert_eq!(ids.len(), 50);

        for (index, id) in ids.iter().enumerate() {
            let path = store.get_path(*id).unwrap();
            assert_eq!(path[0], root);
            for ancestor in &path[1..path.len() - 1] {
                assert!(ids[..index].contains(ancestor));
            }
        }
    }
}
