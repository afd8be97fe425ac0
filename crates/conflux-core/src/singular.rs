//! Singular descriptions: the structural shape of one source type.
//!
//! One node exists per source type, memoized by type identity, so structural
//! equality between singulars is id equality. Nodes live in an arena and refer
//! to each other by [`SingularId`]; construction reserves a node's slot before
//! recursing into its property, super, and subtype links, which is what lets a
//! self-referencing type resolve to its own reservation instead of recursing
//! forever (allocate-then-link).

use std::collections::{HashMap, HashSet};

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::cardinality::Cardinality;
use crate::config::UnifyConfig;
use crate::error::UnifyError;
use crate::reflect::{RawProperty, SourceTypeId, ValueShape};

/// Arena index of a singular description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SingularId(u32);

impl SingularId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// One property of a branch singular.
#[derive(Debug, Clone)]
pub struct SingularProperty {
    pub description: SingularId,
    pub cardinality: Cardinality,
    /// The property's name as the source declares it. The map key it sits
    /// under is what merging aligns on; this field is what downstream
    /// emitters resolve accessors against.
    pub original_name: String,
}

/// The structural shape of one source type.
#[derive(Debug, Clone)]
pub enum SingularNode {
    /// A type with no nested structure: a concrete scalar or an enumeration.
    Leaf {
        ty: SourceTypeId,
        enumeration: bool,
    },
    /// A type with named properties and optional super/subtype links.
    Branch {
        ty: SourceTypeId,
        properties: IndexMap<String, SingularProperty>,
        super_description: Option<SingularId>,
        sub_descriptions: Vec<SingularId>,
    },
}

impl SingularNode {
    /// The concrete type this description originates from.
    pub fn source_type(&self) -> SourceTypeId {
        match self {
            SingularNode::Leaf { ty, .. } | SingularNode::Branch { ty, .. } => *ty,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, SingularNode::Leaf { .. })
    }

    pub fn is_branch(&self) -> bool {
        matches!(self, SingularNode::Branch { .. })
    }

    /// Whether this is a leaf of an enumeration type.
    pub fn is_enumeration(&self) -> bool {
        matches!(
            self,
            SingularNode::Leaf {
                enumeration: true,
                ..
            }
        )
    }

    pub fn properties(&self) -> Option<&IndexMap<String, SingularProperty>> {
        match self {
            SingularNode::Branch { properties, .. } => Some(properties),
            SingularNode::Leaf { .. } => None,
        }
    }

    pub fn super_description(&self) -> Option<SingularId> {
        match self {
            SingularNode::Branch {
                super_description, ..
            } => *super_description,
            SingularNode::Leaf { .. } => None,
        }
    }

    pub fn sub_descriptions(&self) -> &[SingularId] {
        match self {
            SingularNode::Branch {
                sub_descriptions, ..
            } => sub_descriptions,
            SingularNode::Leaf { .. } => &[],
        }
    }
}

/// Finished, immutable arena of singular descriptions.
///
/// Contains exactly the types reachable from the roots of one build, in
/// first-encounter order.
#[derive(Debug)]
pub struct SingularArena {
    nodes: Vec<SingularNode>,
    by_type: HashMap<SourceTypeId, SingularId>,
}

impl SingularArena {
    pub fn node(&self, id: SingularId) -> &SingularNode {
        &self.nodes[id.index()]
    }

    /// The singular built for a source type, if the type was reachable.
    pub fn lookup(&self, ty: SourceTypeId) -> Option<SingularId> {
        self.by_type.get(&ty).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = SingularId> + '_ {
        (0..self.nodes.len()).map(SingularId::from_index)
    }

    /// The node itself, its supertypes walking up, then its subtypes walking
    /// down, each visited once. This is the search space for "every property
    /// name appearing on this contributor": inherited names come from the
    /// up-chain, specialized names from the down-chain. Sibling subtypes of
    /// an ancestor are not part of a node's own hierarchy.
    pub(crate) fn hierarchy_closure(&self, id: SingularId) -> Vec<SingularId> {
        let mut out = vec![id];
        let mut seen: HashSet<SingularId> = HashSet::new();
        seen.insert(id);

        let mut current = id;
        loop {
            match self.node(current).super_description() {
                Some(sup) if seen.insert(sup) => {
                    out.push(sup);
                    current = sup;
                }
                _ => break,
            }
        }

        let mut stack: Vec<SingularId> = self
            .node(id)
            .sub_descriptions()
            .iter()
            .rev()
            .copied()
            .collect();
        while let Some(next) = stack.pop() {
            if !seen.insert(next) {
                continue;
            }
            out.push(next);
            for &sub in self.node(next).sub_descriptions().iter().rev() {
                stack.push(sub);
            }
        }
        out
    }

    /// Union of property names declared anywhere in the contributors'
    /// hierarchy closures, in first-encounter order.
    pub(crate) fn merged_property_names(&self, contributors: &[SingularId]) -> IndexSet<String> {
        let mut names = IndexSet::new();
        for &contributor in contributors {
            for member in self.hierarchy_closure(contributor) {
                if let Some(properties) = self.node(member).properties() {
                    for name in properties.keys() {
                        names.insert(name.clone());
                    }
                }
            }
        }
        names
    }

    /// Every occurrence of `name` within one contributor's hierarchy closure.
    /// More than one occurrence is legitimate when the name is declared
    /// redundantly along the contributor's own chain.
    pub(crate) fn property_occurrences(
        &self,
        contributor: SingularId,
        name: &str,
    ) -> Vec<&SingularProperty> {
        let mut occurrences = Vec::new();
        for member in self.hierarchy_closure(contributor) {
            if let Some(property) = self.node(member).properties().and_then(|p| p.get(name)) {
                occurrences.push(property);
            }
        }
        occurrences
    }

    /// The contributors' own direct supertypes, deduplicated in order.
    pub(crate) fn direct_supers(&self, contributors: &[SingularId]) -> Vec<SingularId> {
        let mut supers = IndexSet::new();
        for &contributor in contributors {
            if let Some(sup) = self.node(contributor).super_description() {
                supers.insert(sup);
            }
        }
        supers.into_iter().collect()
    }

    /// One subtype list per contributor, in contributor order.
    pub(crate) fn subtype_lists(&self, contributors: &[SingularId]) -> Vec<Vec<SingularId>> {
        contributors
            .iter()
            .map(|&c| self.node(c).sub_descriptions().to_vec())
            .collect()
    }
}

/// Two-phase singular construction: slots are reserved in the memo before any
/// recursion, so cycles land on the reservation.
pub(crate) struct SingularBuilder<'a> {
    config: &'a UnifyConfig<'a>,
    slots: Vec<Option<SingularNode>>,
    by_type: HashMap<SourceTypeId, SingularId>,
}

impl<'a> SingularBuilder<'a> {
    pub(crate) fn new(config: &'a UnifyConfig<'a>) -> Self {
        Self {
            config,
            slots: Vec::new(),
            by_type: HashMap::new(),
        }
    }

    /// Build (or fetch) the singular description of `ty`.
    pub(crate) fn build(&mut self, ty: SourceTypeId) -> Result<SingularId, UnifyError> {
        if let Some(&id) = self.by_type.get(&ty) {
            return Ok(id);
        }
        let id = SingularId::from_index(self.slots.len());
        self.slots.push(None);
        self.by_type.insert(ty, id);

        let reflector = self.config.reflector;
        let node = if !reflector.is_branch(ty) {
            SingularNode::Leaf {
                ty,
                enumeration: reflector.is_enumeration(ty),
            }
        } else {
            tracing::trace!(ty = %ty, "describing branch type");
            let mut properties = IndexMap::new();
            for raw in reflector.properties(ty) {
                if !self.config.keep_property(ty, &raw.name) {
                    continue;
                }
                let (value, cardinality) = self.property_value(ty, &raw)?;
                let description = self.build(value)?;
                properties.insert(
                    raw.name.clone(),
                    SingularProperty {
                        description,
                        cardinality,
                        original_name: raw.name,
                    },
                );
            }
            let super_description = match reflector.superclass(ty) {
                Some(sup) => Some(self.build(sup)?),
                None => None,
            };
            let mut sub_descriptions = Vec::new();
            for sub in reflector.subclasses(ty) {
                sub_descriptions.push(self.build(sub)?);
            }
            SingularNode::Branch {
                ty,
                properties,
                super_description,
                sub_descriptions,
            }
        };

        self.slots[id.index()] = Some(node);
        Ok(id)
    }

    fn property_value(
        &self,
        declaring: SourceTypeId,
        raw: &RawProperty,
    ) -> Result<(SourceTypeId, Cardinality), UnifyError> {
        match &raw.shape {
            ValueShape::Sequence(element) => Ok((*element, Cardinality::List)),
            ValueShape::Plain(value) => {
                let cardinality =
                    if !raw.required && !self.config.reflector.is_primitive(*value) {
                        Cardinality::Optional
                    } else {
                        Cardinality::Single
                    };
                Ok((*value, cardinality))
            }
            ValueShape::Unsupported { rendered } => Err(UnifyError::UnsupportedShape {
                declaring: self.config.reflector.type_name(declaring),
                property: raw.name.clone(),
                shape: rendered.clone(),
            }),
        }
    }

    pub(crate) fn finish(self) -> Result<SingularArena, UnifyError> {
        let mut nodes = Vec::with_capacity(self.slots.len());
        for (index, slot) in self.slots.into_iter().enumerate() {
            match slot {
                Some(node) => nodes.push(node),
                None => {
                    return Err(UnifyError::Internal(format!(
                        "singular slot {index} was reserved but never linked"
                    )))
                }
            }
        }
        Ok(SingularArena {
            nodes,
            by_type: self.by_type,
        })
    }
}
