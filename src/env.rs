//! Path-namespaced variable and index store.
//!
//! Every scope-opening node visited during planning is addressed by the
//! `NodePath` leading to it from its task instance. Variables live in the
//! frame of the method or axiom scope that declares them; index cursors
//! (chosen branch, matched row, chosen clause) live at the path of the node
//! that iterates. Bindings are recorded on an undo trail so the condition
//! solver can roll back to a mark when it backtracks.

use smallvec::SmallVec;

use crate::domain::NodeId;
use crate::symbol::Sym;
use crate::value::Value;
use crate::FxHashMap;

/// One step of a node path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Root of a task instance, numbered per planning call.
    Task(u32),
    Node(NodeId),
}

/// Sequence of segments from a task instance root to a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodePath(SmallVec<[Segment; 8]>);

impl NodePath {
    /// Root path of task instance `scope`.
    pub fn task(scope: u32) -> Self {
        let mut segs = SmallVec::new();
        segs.push(Segment::Task(scope));
        NodePath(segs)
    }

    pub fn child(&self, seg: Segment) -> Self {
        let mut segs = self.0.clone();
        segs.push(seg);
        NodePath(segs)
    }

    pub fn contains(&self, seg: Segment) -> bool {
        self.0.contains(&seg)
    }

    pub fn starts_with(&self, prefix: &NodePath) -> bool {
        self.0.starts_with(&prefix.0)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

type Slots = SmallVec<[(Sym, Value); 4]>;

/// Position in the undo trail returned by `Environment::mark`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark(usize);

/// A detached copy of one frame's bindings.
///
/// Task instances pushed by a committed branch share the frame of the
/// method scope that produced them; the scope itself is gone by the time
/// the tasks run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    vars: Slots,
}

impl Frame {
    /// The bound value of `name`, or `Unbound`.
    pub fn get(&self, name: Sym) -> Value {
        self.vars
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Sym, &Value)> {
        self.vars.iter().map(|(n, v)| (*n, v))
    }
}

#[derive(Debug, Default)]
pub struct Environment {
    frames: FxHashMap<NodePath, Slots>,
    indices: FxHashMap<NodePath, usize>,
    trail: Vec<(NodePath, Sym, Option<Value>)>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of `name` in `frame`; `Unbound` when absent.
    pub fn get_variable(&self, frame: &NodePath, name: Sym) -> Value {
        self.frames
            .get(frame)
            .and_then(|slots| slots.iter().find(|(n, _)| *n == name))
            .map(|(_, v)| v.clone())
            .unwrap_or_default()
    }

    /// Bind `name` in `frame`, recording the previous value on the trail.
    pub fn set_variable(&mut self, frame: &NodePath, name: Sym, value: Value) {
        let slots = self.frames.entry(frame.clone()).or_default();
        let previous = match slots.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                slots.push((name, value));
                None
            }
        };
        self.trail.push((frame.clone(), name, previous));
    }

    pub fn get_index(&self, path: &NodePath) -> usize {
        self.indices.get(path).copied().unwrap_or(0)
    }

    pub fn set_index(&mut self, path: &NodePath, index: usize) {
        self.indices.insert(path.clone(), index);
    }

    /// Move the cursor at `path` to the next candidate.
    pub fn advance_index(&mut self, path: &NodePath) {
        *self.indices.entry(path.clone()).or_insert(0) += 1;
    }

    pub fn remove_index(&mut self, path: &NodePath) {
        self.indices.remove(path);
    }

    /// Drop every frame at or below `prefix`, together with their trail
    /// entries.
    pub fn remove_variables(&mut self, prefix: &NodePath) {
        self.frames.retain(|path, _| !path.starts_with(prefix));
        self.trail.retain(|(path, _, _)| !path.starts_with(prefix));
    }

    pub fn mark(&self) -> Mark {
        Mark(self.trail.len())
    }

    /// Undo every binding made since `mark`, newest first.
    pub fn rollback(&mut self, mark: Mark) {
        while self.trail.len() > mark.0 {
            let Some((path, name, previous)) = self.trail.pop() else {
                break;
            };
            let Some(slots) = self.frames.get_mut(&path) else {
                continue;
            };
            match previous {
                Some(value) => {
                    if let Some((_, slot)) = slots.iter_mut().find(|(n, _)| *n == name) {
                        *slot = value;
                    }
                }
                None => {
                    slots.retain(|(n, _)| *n != name);
                    if slots.is_empty() {
                        self.frames.remove(&path);
                    }
                }
            }
        }
    }

    /// Copy the bindings of `frame`.
    pub fn capture(&self, frame: &NodePath) -> Frame {
        Frame {
            vars: self.frames.get(frame).cloned().unwrap_or_default(),
        }
    }

    /// True when no frame, index or trail entry is live.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty() && self.indices.is_empty() && self.trail.is_empty()
    }

    /// Live frames, indices and trail entries.
    pub fn len(&self) -> usize {
        self.frames.len() + self.indices.len() + self.trail.len()
    }

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn num_indices(&self) -> usize {
        self.indices.len()
    }
}

#[cfg(test)]
#[path = "tests/env.rs"]
mod tests;
