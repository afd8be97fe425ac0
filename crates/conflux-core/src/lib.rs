//! Structural unification of parallel type hierarchies.
//!
//! Given N independently-defined but structurally similar type hierarchies
//! (several generated data-binding models of "the same" domain concept, say),
//! conflux computes one normalized description: a single logical shape that
//! knows, per property, how it maps back to each source, what cardinality it
//! has where, and how disagreeing value types were reconciled.
//!
//! The caller supplies the root types, a [`Reflector`] over its type
//! universe, a [`TypeMerger`] policy for leaf types, a normalizer chain, and
//! a subtype grouping; [`unify`] returns the finished compound graph.

pub mod cardinality;
pub mod compound;
pub mod config;
pub mod error;
pub mod group;
pub mod normalize;
pub mod reflect;
pub mod singular;
pub mod snapshot;
mod traverse;

pub use cardinality::Cardinality;
pub use compound::{
    unify, unify_one, CompoundId, CompoundNode, CompoundProperty, CompoundSort, ConstantOrigin,
    Unification, EXPANSION_PROPERTY,
};
pub use config::{PropertyFilter, UnifyConfig};
pub use error::UnifyError;
pub use group::{SubtypeGrouping, SubtypeKeyResolver};
pub use normalize::{KeyResolver, NormalizerKind};
pub use reflect::{
    EnumConstant, MergePolicyError, RawProperty, Reflector, SourceTypeId, TypeMerger, ValueShape,
};
pub use singular::{SingularArena, SingularId, SingularNode, SingularProperty};
pub use snapshot::{GraphSnapshot, NodeSnapshot, PropertySnapshot};
