//! Compound descriptions: the unification engine.
//!
//! A compound is the merged shape of a *set* of singular descriptions. The
//! recursion is memoized by exactly that set (after normalization), which
//! buys two guarantees at once: structurally-equivalent call sites share one
//! node, and a set that reaches itself through a property cycle resolves to
//! its own reservation instead of unrolling forever. Construction follows the
//! two-phase allocate-then-link pattern: a slot is reserved in the memo
//! before any recursion, and the finished node is written into it at the end.

use std::collections::{HashMap, HashSet};

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::cardinality::Cardinality;
use crate::config::UnifyConfig;
use crate::error::UnifyError;
use crate::normalize::NormalizerChain;
use crate::reflect::SourceTypeId;
use crate::singular::{SingularArena, SingularBuilder, SingularId};

/// Name of the reserved property holding the scalar expansion of a branch:
/// "this polymorphic node may instead just be a plain value".
pub const EXPANSION_PROPERTY: &str = "$value";

/// Arena index of a compound description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompoundId(u32);

impl CompoundId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Which of the three shapes a compound node has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompoundSort {
    TypedLeaf,
    EnumeratedLeaf,
    Branch,
}

/// One source enum constant backing a merged display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantOrigin {
    pub source: SourceTypeId,
    pub constant: String,
}

/// One property of a branch compound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundProperty {
    pub description: CompoundId,
    pub cardinality: Cardinality,
}

/// The unified node for a set of singular descriptions.
#[derive(Debug)]
pub enum CompoundNode {
    /// Every contributor is a plain typed leaf; the injected policy decided
    /// the merged concrete type.
    TypedLeaf {
        singulars: Vec<SingularId>,
        merged_type: SourceTypeId,
    },
    /// Every contributor is an enumeration. For each distinct display name,
    /// the constants backing it, one entry per contributing type.
    EnumeratedLeaf {
        singulars: Vec<SingularId>,
        constants: IndexMap<String, Vec<ConstantOrigin>>,
    },
    /// At least one contributor is a branch.
    Branch {
        singulars: Vec<SingularId>,
        properties: IndexMap<String, CompoundProperty>,
        super_description: Option<CompoundId>,
        sub_descriptions: Vec<CompoundId>,
    },
}

impl CompoundNode {
    pub fn sort(&self) -> CompoundSort {
        match self {
            CompoundNode::TypedLeaf { .. } => CompoundSort::TypedLeaf,
            CompoundNode::EnumeratedLeaf { .. } => CompoundSort::EnumeratedLeaf,
            CompoundNode::Branch { .. } => CompoundSort::Branch,
        }
    }

    /// The contributing singulars, in first-seen order.
    pub fn singulars(&self) -> &[SingularId] {
        match self {
            CompoundNode::TypedLeaf { singulars, .. }
            | CompoundNode::EnumeratedLeaf { singulars, .. }
            | CompoundNode::Branch { singulars, .. } => singulars,
        }
    }

    pub fn merged_type(&self) -> Option<SourceTypeId> {
        match self {
            CompoundNode::TypedLeaf { merged_type, .. } => Some(*merged_type),
            _ => None,
        }
    }

    pub fn constants(&self) -> Option<&IndexMap<String, Vec<ConstantOrigin>>> {
        match self {
            CompoundNode::EnumeratedLeaf { constants, .. } => Some(constants),
            _ => None,
        }
    }

    pub fn properties(&self) -> Option<&IndexMap<String, CompoundProperty>> {
        match self {
            CompoundNode::Branch { properties, .. } => Some(properties),
            _ => None,
        }
    }

    pub fn super_description(&self) -> Option<CompoundId> {
        match self {
            CompoundNode::Branch {
                super_description, ..
            } => *super_description,
            _ => None,
        }
    }

    pub fn sub_descriptions(&self) -> &[CompoundId] {
        match self {
            CompoundNode::Branch {
                sub_descriptions, ..
            } => sub_descriptions,
            _ => &[],
        }
    }
}

/// The finished, immutable result of one `unify` call.
///
/// Safe to share read-only once returned; all internal tables are local to
/// the build that produced it.
#[derive(Debug)]
pub struct Unification {
    singulars: SingularArena,
    compounds: Vec<CompoundNode>,
    roots: Vec<CompoundId>,
}

impl Unification {
    pub fn singulars(&self) -> &SingularArena {
        &self.singulars
    }

    pub fn compound(&self, id: CompoundId) -> &CompoundNode {
        &self.compounds[id.index()]
    }

    pub fn compound_count(&self) -> usize {
        self.compounds.len()
    }

    /// One compound per requested root group, in request order.
    pub fn roots(&self) -> &[CompoundId] {
        &self.roots
    }

    /// The first root; convenient for single-group builds.
    pub fn root(&self) -> CompoundId {
        self.roots[0]
    }
}

/// Merge each group of root source types into one compound description.
///
/// Singular construction and normalizer derivation run once over the union of
/// all groups, and the groups are then compounded against one shared memo
/// table, so equivalent groups converge to the identical node. An empty outer
/// list, or any empty group, is a caller error.
pub fn unify(
    config: &UnifyConfig<'_>,
    root_groups: &[Vec<SourceTypeId>],
) -> Result<Unification, UnifyError> {
    if root_groups.is_empty() {
        return Err(UnifyError::EmptyRoots);
    }

    // Phase 1: describe every reachable source type once.
    let mut builder = SingularBuilder::new(config);
    let mut group_ids: Vec<Vec<SingularId>> = Vec::with_capacity(root_groups.len());
    let mut all_roots: IndexSet<SingularId> = IndexSet::new();
    for group in root_groups {
        if group.is_empty() {
            return Err(UnifyError::EmptyRoots);
        }
        let mut ids: IndexSet<SingularId> = IndexSet::new();
        for &ty in group {
            ids.insert(builder.build(ty)?);
        }
        all_roots.extend(ids.iter().copied());
        group_ids.push(ids.into_iter().collect());
    }
    let arena = builder.finish()?;
    tracing::debug!(singulars = arena.len(), "singular descriptions built");

    // Phase 2: derive the normalizer chain with the whole graph in view.
    let roots: Vec<SingularId> = all_roots.into_iter().collect();
    let chain = NormalizerChain::derive(config, &roots, &arena)?;

    // Phase 3: compound each group against one shared memo table.
    let mut compounder = Compounder {
        config,
        arena: &arena,
        chain: &chain,
        slots: Vec::new(),
        memo: HashMap::new(),
    };
    let mut compound_roots = Vec::with_capacity(group_ids.len());
    for ids in &group_ids {
        match compounder.compound(ids)? {
            Some(id) => compound_roots.push(id),
            None => return Err(UnifyError::EmptyRoots),
        }
    }
    let compounds = compounder.finish()?;
    tracing::debug!(compounds = compounds.len(), "unification complete");

    Ok(Unification {
        singulars: arena,
        compounds,
        roots: compound_roots,
    })
}

/// Merge a single set of root source types. See [`unify`].
pub fn unify_one(
    config: &UnifyConfig<'_>,
    roots: &[SourceTypeId],
) -> Result<Unification, UnifyError> {
    unify(config, &[roots.to_vec()])
}

struct Compounder<'a> {
    config: &'a UnifyConfig<'a>,
    arena: &'a SingularArena,
    chain: &'a NormalizerChain,
    slots: Vec<Option<CompoundNode>>,
    /// Keyed by the sorted, deduplicated set of normalized contributors. An
    /// entry whose slot is still `None` is a set under construction; handing
    /// its id out anyway is what breaks cycles.
    memo: HashMap<Vec<SingularId>, CompoundId>,
}

impl Compounder<'_> {
    fn compound(&mut self, input: &[SingularId]) -> Result<Option<CompoundId>, UnifyError> {
        let normalized: Vec<SingularId> = {
            let deduplicated: IndexSet<SingularId> =
                self.chain.apply(input, self.arena).into_iter().collect();
            deduplicated.into_iter().collect()
        };
        if normalized.is_empty() {
            return Ok(None);
        }
        let mut key = normalized.clone();
        key.sort_unstable();
        key.dedup();
        if let Some(&id) = self.memo.get(&key) {
            return Ok(Some(id));
        }
        let id = CompoundId::from_index(self.slots.len());
        self.slots.push(None);
        self.memo.insert(key, id);

        let all_leaves = normalized
            .iter()
            .all(|&singular| self.arena.node(singular).is_leaf());
        let node = if all_leaves {
            self.leaf_compound(normalized)?
        } else {
            self.branch_compound(normalized)?
        };
        self.slots[id.index()] = Some(node);
        Ok(Some(id))
    }

    fn leaf_compound(&mut self, singulars: Vec<SingularId>) -> Result<CompoundNode, UnifyError> {
        let arena = self.arena;
        let reflector = self.config.reflector;
        let all_enumerations = singulars
            .iter()
            .all(|&singular| arena.node(singular).is_enumeration());

        if all_enumerations {
            let mut constants: IndexMap<String, Vec<ConstantOrigin>> = IndexMap::new();
            for &singular in &singulars {
                let ty = arena.node(singular).source_type();
                let mut names_in_type: HashSet<String> = HashSet::new();
                for constant in reflector.enumeration_constants(ty) {
                    if !names_in_type.insert(constant.display_name.clone()) {
                        return Err(UnifyError::DuplicateDisplayName {
                            enumeration: reflector.type_name(ty),
                            name: constant.display_name,
                        });
                    }
                    constants
                        .entry(constant.display_name)
                        .or_default()
                        .push(ConstantOrigin {
                            source: ty,
                            constant: constant.constant,
                        });
                }
            }
            return Ok(CompoundNode::EnumeratedLeaf {
                singulars,
                constants,
            });
        }

        let types: Vec<SourceTypeId> = {
            let mut types: IndexSet<SourceTypeId> = IndexSet::new();
            for &singular in &singulars {
                types.insert(arena.node(singular).source_type());
            }
            types.into_iter().collect()
        };
        let merged_type = self.config.merger.merge(&types)?;
        Ok(CompoundNode::TypedLeaf {
            singulars,
            merged_type,
        })
    }

    fn branch_compound(&mut self, singulars: Vec<SingularId>) -> Result<CompoundNode, UnifyError> {
        let arena = self.arena;
        let branches: Vec<SingularId> = singulars
            .iter()
            .copied()
            .filter(|&singular| arena.node(singular).is_branch())
            .collect();
        let leaves: Vec<SingularId> = singulars
            .iter()
            .copied()
            .filter(|&singular| arena.node(singular).is_leaf())
            .collect();

        let mut properties: IndexMap<String, CompoundProperty> = IndexMap::new();

        // Leaf contributors fold into the reserved expansion property: the
        // merged node may hold structure or may just be a plain value.
        let has_expansion = !leaves.is_empty();
        if has_expansion {
            if let Some(expansion) = self.compound(&leaves)? {
                properties.insert(
                    EXPANSION_PROPERTY.to_string(),
                    CompoundProperty {
                        description: expansion,
                        cardinality: Cardinality::Optional,
                    },
                );
            }
        }

        for name in arena.merged_property_names(&branches) {
            let mut value_ids: Vec<SingularId> = Vec::new();
            let mut merged_cardinality: Option<Cardinality> = None;
            for &contributor in &branches {
                let occurrences = arena.property_occurrences(contributor, &name);
                let contributed = Cardinality::merge_all(
                    occurrences.iter().map(|occurrence| occurrence.cardinality),
                );
                for occurrence in occurrences {
                    value_ids.push(occurrence.description);
                }
                // A contributor that lacks the property can always present
                // it absent, which is exactly Optional.
                let contributed = contributed.unwrap_or(Cardinality::Optional);
                merged_cardinality = Some(match merged_cardinality {
                    Some(current) => current.merge(contributed),
                    None => contributed,
                });
            }
            let mut cardinality = merged_cardinality.unwrap_or(Cardinality::Optional);
            if has_expansion {
                cardinality = cardinality.merge(Cardinality::Optional);
            }
            if let Some(description) = self.compound(&value_ids)? {
                properties.insert(
                    name,
                    CompoundProperty {
                        description,
                        cardinality,
                    },
                );
            }
        }

        let supers = arena.direct_supers(&branches);
        let super_description = if supers.is_empty() {
            None
        } else {
            self.compound(&supers)?
        };

        let mut sub_descriptions = Vec::new();
        let sub_lists = arena.subtype_lists(&branches);
        if sub_lists.iter().any(|list| !list.is_empty()) {
            let groups =
                self.config
                    .grouping
                    .group(&sub_lists, arena, self.config.reflector)?;
            for group in groups {
                if let Some(sub) = self.compound(&group)? {
                    sub_descriptions.push(sub);
                }
            }
        }

        Ok(CompoundNode::Branch {
            singulars,
            properties,
            super_description,
            sub_descriptions,
        })
    }

    fn finish(self) -> Result<Vec<CompoundNode>, UnifyError> {
        let mut compounds = Vec::with_capacity(self.slots.len());
        for (index, slot) in self.slots.into_iter().enumerate() {
            match slot {
                Some(node) => compounds.push(node),
                None => {
                    return Err(UnifyError::Internal(format!(
                        "compound slot {index} was reserved but never linked"
                    )))
                }
            }
        }
        Ok(compounds)
    }
}
