//! Serializable structural snapshots of a finished graph.
//!
//! A snapshot flattens the arena into plain data: node indices instead of
//! ids, type names instead of handles. It exists for debugging dumps and for
//! tests that want to compare two builds structurally; it performs no I/O of
//! its own.

use indexmap::IndexMap;
use serde::Serialize;

use crate::cardinality::Cardinality;
use crate::compound::{CompoundNode, CompoundSort, Unification};
use crate::reflect::Reflector;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphSnapshot {
    pub roots: Vec<usize>,
    pub nodes: Vec<NodeSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSnapshot {
    pub sort: CompoundSort,
    /// Type names of the contributing singulars, in contribution order.
    pub sources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_type: Option<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, PropertySnapshot>,
    /// Display name to `Type.CONSTANT` renderings of the backing constants.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub constants: IndexMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub super_description: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sub_descriptions: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertySnapshot {
    pub node: usize,
    pub cardinality: Cardinality,
}

impl GraphSnapshot {
    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl Unification {
    /// Flatten the graph into plain serializable data. The reflector supplies
    /// the display names; structure comes from the arenas.
    pub fn snapshot(&self, reflector: &dyn Reflector) -> GraphSnapshot {
        let singular_name = |id| {
            reflector.type_name(self.singulars().node(id).source_type())
        };
        let nodes = (0..self.compound_count())
            .map(crate::compound::CompoundId::from_index)
            .map(|id| {
                let node = self.compound(id);
                let sources = node.singulars().iter().map(|&s| singular_name(s)).collect();
                match node {
                    CompoundNode::TypedLeaf { merged_type, .. } => NodeSnapshot {
                        sort: CompoundSort::TypedLeaf,
                        sources,
                        merged_type: Some(reflector.type_name(*merged_type)),
                        properties: IndexMap::new(),
                        constants: IndexMap::new(),
                        super_description: None,
                        sub_descriptions: Vec::new(),
                    },
                    CompoundNode::EnumeratedLeaf { constants, .. } => NodeSnapshot {
                        sort: CompoundSort::EnumeratedLeaf,
                        sources,
                        merged_type: None,
                        properties: IndexMap::new(),
                        constants: constants
                            .iter()
                            .map(|(display, origins)| {
                                let rendered = origins
                                    .iter()
                                    .map(|origin| {
                                        format!(
                                            "{}.{}",
                                            reflector.type_name(origin.source),
                                            origin.constant
                                        )
                                    })
                                    .collect();
                                (display.clone(), rendered)
                            })
                            .collect(),
                        super_description: None,
                        sub_descriptions: Vec::new(),
                    },
                    CompoundNode::Branch {
                        properties,
                        super_description,
                        sub_descriptions,
                        ..
                    } => NodeSnapshot {
                        sort: CompoundSort::Branch,
                        sources,
                        merged_type: None,
                        properties: properties
                            .iter()
                            .map(|(name, property)| {
                                (
                                    name.clone(),
                                    PropertySnapshot {
                                        node: property.description.index(),
                                        cardinality: property.cardinality,
                                    },
                                )
                            })
                            .collect(),
                        constants: IndexMap::new(),
                        super_description: super_description.map(|sup| sup.index()),
                        sub_descriptions: sub_descriptions
                            .iter()
                            .map(|sub| sub.index())
                            .collect(),
                    },
                }
            })
            .collect();

        GraphSnapshot {
            roots: self.roots().iter().map(|root| root.index()).collect(),
            nodes,
        }
    }
}
