//! Scoped entry into an AST node.
//!
//! A `NodeScope` extends the active path by one segment for as long as it
//! lives. Leaving the scope, on success, failure or early return alike,
//! removes every variable frame at or below its path and the index stored
//! at its path, so state created while a node was active never outlives it.
//!
//! Entering a node whose segment is already on the active path is refused:
//! that is the reentrancy (cycle) guard.

use std::ops::{Deref, DerefMut};

use crate::env::{Environment, NodePath, Segment};
use crate::trace::trace;

pub struct NodeScope<'e> {
    env: &'e mut Environment,
    path: NodePath,
}

impl<'e> NodeScope<'e> {
    /// Enter `seg` below `parent`. Returns `None` when `seg` is already on
    /// `parent`.
    pub fn enter(env: &'e mut Environment, parent: &NodePath, seg: Segment) -> Option<Self> {
        if parent.contains(seg) {
            trace!(?seg, depth = parent.len(), "reentrant scope refused");
            return None;
        }
        Some(Self {
            env,
            path: parent.child(seg),
        })
    }

    pub fn path(&self) -> &NodePath {
        &self.path
    }

    /// The iteration cursor of this node.
    pub fn index(&self) -> usize {
        self.env.get_index(&self.path)
    }

    pub fn set_index(&mut self, index: usize) {
        self.env.set_index(&self.path, index);
    }

    pub fn advance(&mut self) {
        self.env.advance_index(&self.path);
    }
}

impl Deref for NodeScope<'_> {
    type Target = Environment;

    fn deref(&self) -> &Environment {
        self.env
    }
}

impl DerefMut for NodeScope<'_> {
    fn deref_mut(&mut self) -> &mut Environment {
        self.env
    }
}

impl Drop for NodeScope<'_> {
    fn drop(&mut self) {
        self.env.remove_variables(&self.path);
        self.env.remove_index(&self.path);
    }
}
