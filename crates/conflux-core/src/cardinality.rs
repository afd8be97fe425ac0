//! The three-element cardinality lattice shared by every merge step.

use serde::{Deserialize, Serialize};

/// How many values a property holds in a contributing source.
///
/// The variants form a lattice ordered `Single < Optional < List`: merging
/// takes the upper bound, so `List` absorbs everything and `Optional` absorbs
/// `Single`. A property that is mandatory in one source but missing or
/// repeated in another can only ever widen, never narrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// Exactly one value.
    Single,
    /// Zero or one value.
    Optional,
    /// Zero or more values.
    List,
}

impl Cardinality {
    /// Least upper bound of two cardinalities.
    pub fn merge(self, other: Cardinality) -> Cardinality {
        self.max(other)
    }

    /// Fold a sequence of cardinalities through the lattice.
    ///
    /// `None` when the sequence is empty; callers decide what absence means
    /// at their level.
    pub fn merge_all<I>(iter: I) -> Option<Cardinality>
    where
        I: IntoIterator<Item = Cardinality>,
    {
        iter.into_iter().reduce(Cardinality::merge)
    }
}

#[cfg(test)]
mod tests {
    use super::Cardinality::{List, Optional, Single};
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn merge_table() {
        assert_eq!(Single.merge(Single), Single);
        assert_eq!(Single.merge(Optional), Optional);
        assert_eq!(Single.merge(List), List);
        assert_eq!(Optional.merge(Single), Optional);
        assert_eq!(Optional.merge(Optional), Optional);
        assert_eq!(Optional.merge(List), List);
        assert_eq!(List.merge(Single), List);
        assert_eq!(List.merge(Optional), List);
        assert_eq!(List.merge(List), List);
    }

    #[test]
    fn merge_all_folds_in_order() {
        assert_eq!(Cardinality::merge_all([]), None);
        assert_eq!(Cardinality::merge_all([Single]), Some(Single));
        assert_eq!(
            Cardinality::merge_all([Single, Optional, Single]),
            Some(Optional)
        );
        assert_eq!(Cardinality::merge_all([Optional, List]), Some(List));
    }

    fn any_cardinality() -> impl Strategy<Value = Cardinality> {
        prop_oneof![Just(Single), Just(Optional), Just(List)]
    }

    proptest! {
        #[test]
        fn merge_is_commutative(a in any_cardinality(), b in any_cardinality()) {
            prop_assert_eq!(a.merge(b), b.merge(a));
        }

        #[test]
        fn merge_is_idempotent(a in any_cardinality()) {
            prop_assert_eq!(a.merge(a), a);
        }

        #[test]
        fn merge_is_associative(
            a in any_cardinality(),
            b in any_cardinality(),
            c in any_cardinality(),
        ) {
            prop_assert_eq!(a.merge(b).merge(c), a.merge(b.merge(c)));
        }

        #[test]
        fn list_absorbs_everything(a in any_cardinality()) {
            prop_assert_eq!(List.merge(a), List);
        }

        #[test]
        fn merge_never_narrows(a in any_cardinality(), b in any_cardinality()) {
            prop_assert!(a.merge(b) >= a);
            prop_assert!(a.merge(b) >= b);
        }
    }
}
