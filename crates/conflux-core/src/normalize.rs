//! Normalizers: which singular descriptions count as the same thing.
//!
//! Compound construction only ever sees a local slice of singulars, but the
//! decision "these two types are really one" has to be made with the whole
//! graph in view, or two structurally-equivalent call sites would drift into
//! two different cached compounds. So the chain is derived exactly once per
//! top-level build, from the full initial root list, and the derived
//! substitution is then re-applied at every recursive merge step.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use indexmap::{IndexMap, IndexSet};
use petgraph::unionfind::UnionFind;

use crate::config::UnifyConfig;
use crate::error::UnifyError;
use crate::reflect::SourceTypeId;
use crate::singular::{SingularArena, SingularId};

/// Caller-supplied key for the key normalizer. `None` leaves the type
/// ungrouped.
pub type KeyResolver = Box<dyn Fn(SourceTypeId) -> Option<String>>;

/// A normalizer selected in the configuration. Passes compose left-to-right.
pub enum NormalizerKind {
    /// Deduplicate by identity, preserving first-seen order.
    Default,
    /// Types that ever co-occur in the same list at a merge call site are one
    /// equivalence class, closed under an iterative fixed point.
    Intersecting,
    /// Enumerations whose constant-name sets are comparable (one a subset of
    /// the other) are one class.
    Enumerating,
    /// Types resolving to the same caller-supplied key are one class.
    Key(KeyResolver),
}

/// One derived pass: a substitution of every singular by its full class.
pub(crate) struct DerivedPass {
    classes: HashMap<SingularId, Vec<SingularId>>,
    /// The intersecting normalizer must not let an expansion drag branch
    /// types into an all-leaf list; leaves merge only with leaves.
    drop_branches_for_leaf_input: bool,
}

impl DerivedPass {
    fn identity() -> Self {
        Self {
            classes: HashMap::new(),
            drop_branches_for_leaf_input: false,
        }
    }

    fn apply(&self, input: &[SingularId], arena: &SingularArena) -> Vec<SingularId> {
        let leaves_only = !input.is_empty() && input.iter().all(|&id| arena.node(id).is_leaf());
        let mut out: IndexSet<SingularId> = IndexSet::new();
        for &id in input {
            match self.classes.get(&id) {
                Some(class) => {
                    for &member in class {
                        if self.drop_branches_for_leaf_input
                            && leaves_only
                            && arena.node(member).is_branch()
                        {
                            continue;
                        }
                        out.insert(member);
                    }
                }
                None => {
                    out.insert(id);
                }
            }
        }
        out.into_iter().collect()
    }
}

/// The composed chain, derived once per top-level build.
pub(crate) struct NormalizerChain {
    passes: Vec<DerivedPass>,
}

impl NormalizerChain {
    pub(crate) fn derive(
        config: &UnifyConfig<'_>,
        roots: &[SingularId],
        arena: &SingularArena,
    ) -> Result<Self, UnifyError> {
        let mut passes = Vec::with_capacity(config.normalizers.len());
        for kind in &config.normalizers {
            let pass = match kind {
                NormalizerKind::Default => DerivedPass::identity(),
                NormalizerKind::Intersecting => derive_intersecting(config, roots, arena)?,
                NormalizerKind::Enumerating => derive_enumerating(config, arena),
                NormalizerKind::Key(resolver) => derive_key(arena, resolver),
            };
            passes.push(pass);
        }
        Ok(Self { passes })
    }

    /// Apply every pass left-to-right. The empty chain is the identity.
    pub(crate) fn apply(&self, input: &[SingularId], arena: &SingularArena) -> Vec<SingularId> {
        let mut current = input.to_vec();
        for pass in &self.passes {
            current = pass.apply(&current, arena);
        }
        current
    }
}

/// Walk every list of singulars that would reach a merge call site, starting
/// from the initial roots, and record which singulars co-occurred. The walk
/// mirrors the compound recursion (properties, then supertypes, then grouped
/// subtypes), memoized by set so cyclic graphs terminate.
fn derive_intersecting(
    config: &UnifyConfig<'_>,
    roots: &[SingularId],
    arena: &SingularArena,
) -> Result<DerivedPass, UnifyError> {
    let mut harvester = Harvester {
        config,
        arena,
        seen: HashSet::new(),
        co: BTreeMap::new(),
    };
    harvester.visit(roots)?;
    let mut co = harvester.co;
    close_cooccurrence(&mut co);

    let mut classes = HashMap::with_capacity(co.len());
    for (id, set) in co {
        classes.insert(id, set.into_iter().collect());
    }
    tracing::debug!(
        tracked = classes.len(),
        "derived intersecting equivalence classes"
    );
    Ok(DerivedPass {
        classes,
        drop_branches_for_leaf_input: true,
    })
}

struct Harvester<'a> {
    config: &'a UnifyConfig<'a>,
    arena: &'a SingularArena,
    seen: HashSet<Vec<SingularId>>,
    co: BTreeMap<SingularId, BTreeSet<SingularId>>,
}

impl Harvester<'_> {
    fn visit(&mut self, list: &[SingularId]) -> Result<(), UnifyError> {
        let mut set = list.to_vec();
        set.sort_unstable();
        set.dedup();
        if set.is_empty() || !self.seen.insert(set.clone()) {
            return Ok(());
        }
        for &member in &set {
            self.co
                .entry(member)
                .or_default()
                .extend(set.iter().copied());
        }

        let branches: Vec<SingularId> = {
            let mut branches: IndexSet<SingularId> = IndexSet::new();
            for &member in list {
                if self.arena.node(member).is_branch() {
                    branches.insert(member);
                }
            }
            branches.into_iter().collect()
        };
        if branches.is_empty() {
            return Ok(());
        }

        for name in self.arena.merged_property_names(&branches) {
            let mut values = Vec::new();
            for &contributor in &branches {
                for occurrence in self.arena.property_occurrences(contributor, &name) {
                    values.push(occurrence.description);
                }
            }
            self.visit(&values)?;
        }

        let supers = self.arena.direct_supers(&branches);
        self.visit(&supers)?;

        let sub_lists = self.arena.subtype_lists(&branches);
        if sub_lists.iter().any(|list| !list.is_empty()) {
            let groups = self
                .config
                .grouping
                .group(&sub_lists, self.arena, self.config.reflector)?;
            for group in groups {
                self.visit(&group)?;
            }
        }
        Ok(())
    }
}

/// Iterative fixed point over the co-occurrence sets: whenever some tracked
/// singular's set mentions `s` but holds members `s`'s own set lacks, those
/// members belong in `s`'s class too. Repeats until no set grows.
fn close_cooccurrence(co: &mut BTreeMap<SingularId, BTreeSet<SingularId>>) {
    let ids: Vec<SingularId> = co.keys().copied().collect();
    loop {
        let mut changed = false;
        for &s in &ids {
            for &t in &ids {
                if s == t {
                    continue;
                }
                let grow = {
                    let other = &co[&t];
                    other.contains(&s) && !other.is_subset(&co[&s])
                };
                if grow {
                    let additions: Vec<SingularId> = co[&t].iter().copied().collect();
                    if let Some(own) = co.get_mut(&s) {
                        own.extend(additions);
                    }
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }
}

/// Enumerations relate when one constant-name set contains the other; a
/// single pass over the pairs is enough, the union-find supplies the rest.
fn derive_enumerating(config: &UnifyConfig<'_>, arena: &SingularArena) -> DerivedPass {
    let enums: Vec<SingularId> = arena
        .ids()
        .filter(|&id| arena.node(id).is_enumeration())
        .collect();
    let name_sets: Vec<BTreeSet<String>> = enums
        .iter()
        .map(|&id| {
            config
                .reflector
                .enumeration_constants(arena.node(id).source_type())
                .into_iter()
                .map(|constant| constant.constant)
                .collect()
        })
        .collect();

    let mut union: UnionFind<usize> = UnionFind::new(enums.len());
    for i in 0..enums.len() {
        for j in (i + 1)..enums.len() {
            if name_sets[i].is_subset(&name_sets[j]) || name_sets[j].is_subset(&name_sets[i]) {
                union.union(i, j);
            }
        }
    }

    let mut by_root: IndexMap<usize, Vec<SingularId>> = IndexMap::new();
    for (index, &id) in enums.iter().enumerate() {
        by_root.entry(union.find(index)).or_default().push(id);
    }
    let mut classes = HashMap::new();
    for class in by_root.values() {
        for &member in class {
            classes.insert(member, class.clone());
        }
    }
    DerivedPass {
        classes,
        drop_branches_for_leaf_input: false,
    }
}

/// Branches and enumeration leaves sharing a resolved key are one class;
/// plain typed leaves are never keyed.
fn derive_key(arena: &SingularArena, resolver: &KeyResolver) -> DerivedPass {
    let mut by_key: IndexMap<String, Vec<SingularId>> = IndexMap::new();
    for id in arena.ids() {
        let node = arena.node(id);
        if !node.is_branch() && !node.is_enumeration() {
            continue;
        }
        if let Some(key) = resolver(node.source_type()) {
            by_key.entry(key).or_default().push(id);
        }
    }
    let mut classes = HashMap::new();
    for class in by_key.values() {
        for &member in class {
            classes.insert(member, class.clone());
        }
    }
    DerivedPass {
        classes,
        drop_branches_for_leaf_input: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(index: usize) -> SingularId {
        SingularId::from_index(index)
    }

    fn set(ids: &[usize]) -> BTreeSet<SingularId> {
        ids.iter().map(|&index| id(index)).collect()
    }

    #[test]
    fn fixed_point_unions_overlapping_sets() {
        // 0 co-occurred with 1; elsewhere 1 co-occurred with 2. Class of 1
        // must grow to {0,1,2}, and then 0 and 2 absorb it transitively.
        let mut co = BTreeMap::new();
        co.insert(id(0), set(&[0, 1]));
        co.insert(id(1), set(&[0, 1, 2]));
        co.insert(id(2), set(&[1, 2]));
        close_cooccurrence(&mut co);
        assert_eq!(co[&id(0)], set(&[0, 1, 2]));
        assert_eq!(co[&id(1)], set(&[0, 1, 2]));
        assert_eq!(co[&id(2)], set(&[0, 1, 2]));
    }

    #[test]
    fn fixed_point_leaves_disjoint_sets_alone() {
        let mut co = BTreeMap::new();
        co.insert(id(0), set(&[0, 1]));
        co.insert(id(1), set(&[0, 1]));
        co.insert(id(2), set(&[2]));
        close_cooccurrence(&mut co);
        assert_eq!(co[&id(0)], set(&[0, 1]));
        assert_eq!(co[&id(2)], set(&[2]));
    }
}
