//! Alignment of per-source subtype lists into merge groups.
//!
//! When several branch contributors each declare a subtype hierarchy, the
//! engine has to decide which subtype of source A unifies with which subtype
//! of source B. That decision is this module's only job; the resulting groups
//! are handed straight back into the compound recursion.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::error::UnifyError;
use crate::reflect::{Reflector, SourceTypeId};
use crate::singular::{SingularArena, SingularId};

/// Caller-resolved discriminator for key-aligned grouping.
pub type SubtypeKeyResolver = Box<dyn Fn(SourceTypeId) -> String>;

/// Strategy for aligning the contributors' subtype lists.
pub enum SubtypeGrouping {
    /// Position `i` of every source's subtype list unifies together. Shorter
    /// lists simply contribute nothing to the trailing groups; callers are
    /// responsible for pre-sorting the lists consistently.
    ByIndex,
    /// Subtypes sharing a short type name unify together.
    ByTypeName,
    /// Subtypes sharing a caller-resolved discriminator unify together.
    ByKey(SubtypeKeyResolver),
}

impl SubtypeGrouping {
    /// Partition the per-source subtype lists into merge groups, in
    /// first-encounter order. A duplicate key within one source's list is a
    /// fatal ambiguity: there would be no way to tell which of the two
    /// subtypes the other sources' match belongs with.
    pub(crate) fn group(
        &self,
        lists: &[Vec<SingularId>],
        arena: &SingularArena,
        reflector: &dyn Reflector,
    ) -> Result<Vec<Vec<SingularId>>, UnifyError> {
        match self {
            SubtypeGrouping::ByIndex => Ok(Self::by_index(lists)),
            SubtypeGrouping::ByTypeName => {
                Self::by_key(lists, arena, reflector, &|ty| reflector.type_name(ty))
            }
            SubtypeGrouping::ByKey(resolver) => Self::by_key(lists, arena, reflector, resolver),
        }
    }

    fn by_index(lists: &[Vec<SingularId>]) -> Vec<Vec<SingularId>> {
        let width = lists.iter().map(Vec::len).max().unwrap_or(0);
        (0..width)
            .map(|position| {
                lists
                    .iter()
                    .filter_map(|list| list.get(position).copied())
                    .collect()
            })
            .collect()
    }

    fn by_key(
        lists: &[Vec<SingularId>],
        arena: &SingularArena,
        reflector: &dyn Reflector,
        resolver: &dyn Fn(SourceTypeId) -> String,
    ) -> Result<Vec<Vec<SingularId>>, UnifyError> {
        let mut groups: IndexMap<String, Vec<SingularId>> = IndexMap::new();
        for list in lists {
            let mut keys_in_list: HashSet<String> = HashSet::new();
            for &id in list {
                let ty = arena.node(id).source_type();
                let key = resolver(ty);
                if !keys_in_list.insert(key.clone()) {
                    return Err(UnifyError::AmbiguousSubtypeKey {
                        subtype: reflector.type_name(ty),
                        key,
                    });
                }
                groups.entry(key).or_default().push(id);
            }
        }
        Ok(groups.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn by_index_pads_shorter_lists() {
        let lists = vec![
            vec![SingularId::from_index(0), SingularId::from_index(1)],
            vec![SingularId::from_index(2)],
        ];
        let groups = SubtypeGrouping::by_index(&lists);
        assert_eq!(
            groups,
            vec![
                vec![SingularId::from_index(0), SingularId::from_index(2)],
                vec![SingularId::from_index(1)],
            ]
        );
    }

    #[test]
    fn by_index_of_nothing_is_empty() {
        assert!(SubtypeGrouping::by_index(&[]).is_empty());
        assert!(SubtypeGrouping::by_index(&[vec![], vec![]]).is_empty());
    }
}
