//! Depth-first traversal over a finished unification graph.
//!
//! The walk carries no memory between invocations: a fresh traversal visits
//! everything reachable again, and a node shared between two properties is
//! reported once per path that reaches it. Only a node already on the current
//! descent path is skipped, so cyclic graphs terminate. Callers prune instead
//! through the branch callback's return value.

use indexmap::IndexMap;

use crate::compound::{CompoundId, CompoundNode, CompoundProperty, ConstantOrigin, Unification};

impl Unification {
    /// Walk the compound graph depth-first from `root`.
    ///
    /// An enumerated leaf invokes `on_enumerated_leaf` and descends no
    /// further. A branch invokes `on_branch`; when it answers `true`, the
    /// walk descends into every property's description, then the supertype,
    /// then every subtype. Typed leaves trigger neither callback.
    pub fn traverse<E, B>(&self, root: CompoundId, on_enumerated_leaf: &mut E, on_branch: &mut B)
    where
        E: FnMut(CompoundId, &IndexMap<String, Vec<ConstantOrigin>>),
        B: FnMut(CompoundId, &IndexMap<String, CompoundProperty>) -> bool,
    {
        let mut path = Vec::new();
        self.walk(root, &mut path, on_enumerated_leaf, on_branch);
    }

    fn walk<E, B>(
        &self,
        id: CompoundId,
        path: &mut Vec<CompoundId>,
        on_enumerated_leaf: &mut E,
        on_branch: &mut B,
    ) where
        E: FnMut(CompoundId, &IndexMap<String, Vec<ConstantOrigin>>),
        B: FnMut(CompoundId, &IndexMap<String, CompoundProperty>) -> bool,
    {
        match self.compound(id) {
            CompoundNode::TypedLeaf { .. } => {}
            CompoundNode::EnumeratedLeaf { constants, .. } => on_enumerated_leaf(id, constants),
            CompoundNode::Branch {
                properties,
                super_description,
                sub_descriptions,
                ..
            } => {
                if !on_branch(id, properties) {
                    return;
                }
                path.push(id);
                for property in properties.values() {
                    if !path.contains(&property.description) {
                        self.walk(property.description, path, on_enumerated_leaf, on_branch);
                    }
                }
                if let Some(sup) = super_description {
                    if !path.contains(sup) {
                        self.walk(*sup, path, on_enumerated_leaf, on_branch);
                    }
                }
                for &sub in sub_descriptions {
                    if !path.contains(&sub) {
                        self.walk(sub, path, on_enumerated_leaf, on_branch);
                    }
                }
                path.pop();
            }
        }
    }
}
