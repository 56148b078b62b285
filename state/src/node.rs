//! Path-scoped views over the state tree.

use std::fmt;

use strata_types::{Path, PathError, Value};

use crate::tree::StateTree;

/// A view bound to a location in a [`StateTree`]: `[root_key, ..path]`.
///
/// A node holds no data. Reads fall back to the node's default when nothing is
/// stored; writes replace the tree through a single atomic swap.
#[derive(Clone)]
pub struct PathNode {
    tree: StateTree,
    path: Path,
    default: Value,
}

impl PathNode {
    pub fn new(tree: &StateTree, path: impl Into<Path>, default: Value) -> Self {
        Self {
            tree: tree.clone(),
            path: path.into(),
            default,
        }
    }

    /// Path relative to the tree's root key.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn default_value(&self) -> &Value {
        &self.default
    }

    #[must_use]
    pub fn tree(&self) -> &StateTree {
        &self.tree
    }

    #[must_use]
    pub fn has(&self, sub: impl Into<Path>) -> bool {
        self.tree.get_state().contains_in(&self.absolute(&sub.into()))
    }

    /// Number of immediate children stored at this node.
    #[must_use]
    pub fn size(&self) -> usize {
        self.stored(&Path::root()).map_or(0, |value| value.len())
    }

    /// The whole subtree, or the node default.
    #[must_use]
    pub fn value(&self) -> Value {
        self.get_in(Path::root(), self.default.clone())
    }

    /// `sub` relative to this node, falling back to the node default.
    #[must_use]
    pub fn get(&self, sub: impl Into<Path>) -> Value {
        self.get_in(sub, self.default.clone())
    }

    #[must_use]
    pub fn get_in(&self, sub: impl Into<Path>, default: Value) -> Value {
        self.stored(&sub.into()).unwrap_or(default)
    }

    pub fn set(&self, value: Value) -> Result<(), PathError> {
        self.set_in(Path::root(), value)
    }

    pub fn set_in(&self, sub: impl Into<Path>, value: Value) -> Result<(), PathError> {
        let target = self.absolute(&sub.into());
        self.tree
            .modify(|tree| tree.set_in(&target, value).map(|()| true))
            .map(drop)
    }

    /// Read-modify-write of the whole node.
    pub fn update(&self, updater: impl FnOnce(Value) -> Value) -> Result<(), PathError> {
        self.update_in(Path::root(), self.default.clone(), updater)
    }

    /// Read-modify-write of `sub`, seeded with `default` when nothing is stored.
    ///
    /// The result is committed in one tree swap. `updater` may read the tree,
    /// but sees the state from before this write.
    pub fn update_in(
        &self,
        sub: impl Into<Path>,
        default: Value,
        updater: impl FnOnce(Value) -> Value,
    ) -> Result<(), PathError> {
        let target = self.absolute(&sub.into());
        self.tree
            .modify(|tree| tree.update_in(&target, default, updater).map(|()| true))
            .map(drop)
    }

    /// Edits the node's value (or its default) in place, committing the result
    /// in one tree swap. Nothing is written if `edit` fails.
    pub fn edit(
        &self,
        edit: impl FnOnce(&mut Value) -> Result<(), PathError>,
    ) -> Result<(), PathError> {
        let target = self.absolute(&Path::root());
        let default = self.default.clone();
        self.tree
            .modify(|tree| {
                let mut value = tree.get_in(&target).cloned().unwrap_or(default);
                edit(&mut value)?;
                tree.set_in(&target, value)?;
                Ok(true)
            })
            .map(drop)
    }

    /// Deletes the subtree at `sub`. Removing a missing path is a no-op.
    ///
    /// Returns whether anything was removed.
    pub fn remove_in(&self, sub: impl Into<Path>) -> bool {
        let target = self.absolute(&sub.into());
        let removed = self
            .tree
            .modify(|tree| Ok(tree.remove_in(&target).is_some()))
            .unwrap_or(false);
        if !removed {
            tracing::debug!(path = %target, "remove_in: nothing stored, state unchanged");
        }
        removed
    }

    /// Deletes everything stored under this node.
    pub fn empty(&self) -> bool {
        self.remove_in(Path::root())
    }

    /// Keys of the immediate children; empty when nothing is stored yet.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.stored(&Path::root())
            .map(|value| value.keys())
            .unwrap_or_default()
    }

    /// A new node at `self.path + sub`. No data is copied.
    #[must_use]
    pub fn sub(&self, sub: impl Into<Path>, default: Value) -> PathNode {
        PathNode {
            tree: self.tree.clone(),
            path: self.path.join(sub),
            default,
        }
    }

    fn absolute(&self, sub: &Path) -> Path {
        Path::from(self.tree.root_key()).join(&self.path).join(sub)
    }

    fn stored(&self, sub: &Path) -> Option<Value> {
        self.tree.get_state().get_in(&self.absolute(sub)).cloned()
    }
}

impl fmt::Debug for PathNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathNode")
            .field("path", &self.path)
            .field("default", &self.default)
            .finish_non_exhaustive()
    }
}
