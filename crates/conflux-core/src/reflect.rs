//! Contracts between the engine and its caller-supplied collaborators.
//!
//! The engine never inspects concrete types itself. Everything it knows about
//! the caller's type universe arrives through the [`Reflector`], and every
//! decision about reconciling disagreeing leaf types is delegated to the
//! [`TypeMerger`]. Both are assumed synchronous, side-effect-free, and
//! deterministic for the duration of one build.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque handle for one concrete type in the caller's type universe.
///
/// Compared and hashed by identity only. Callers mint the handles (usually by
/// interning whatever their real type representation is) and resolve them back
/// through their own tables; the engine just carries them around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceTypeId(u32);

impl SourceTypeId {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SourceTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The generic shape of a property's declared value type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueShape {
    /// A plain, non-parametric value type.
    Plain(SourceTypeId),
    /// A single-parameter sequence of the element type.
    Sequence(SourceTypeId),
    /// Any other parametric shape. Rejected during singular construction;
    /// `rendered` is the human-readable form used in the error.
    Unsupported { rendered: String },
}

/// One property as reported by the reflector, before filtering.
#[derive(Debug, Clone)]
pub struct RawProperty {
    pub name: String,
    pub shape: ValueShape,
    /// Whether the source declares the value mandatory. Ignored for
    /// sequences and for primitive values, which cannot be absent.
    pub required: bool,
}

impl RawProperty {
    pub fn new(name: impl Into<String>, shape: ValueShape, required: bool) -> Self {
        Self {
            name: name.into(),
            shape,
            required,
        }
    }
}

/// One constant of an enumeration type together with its display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumConstant {
    /// The constant's identifier within its declaring enumeration.
    pub constant: String,
    /// The name the constant presents under after merging.
    pub display_name: String,
}

/// Structural reflection over the caller's type universe.
///
/// `properties`, `superclass`, and `subclasses` are only consulted for types
/// the reflector itself reported as branches; the remaining queries must be
/// answerable for every handle the reflector has handed out.
pub trait Reflector {
    /// Short display name, used for grouping keys and error messages.
    fn type_name(&self, ty: SourceTypeId) -> String;

    /// Whether the type has named properties worth descending into.
    /// Primitives and enumerations answer `false` and become leaves.
    fn is_branch(&self, ty: SourceTypeId) -> bool;

    fn is_enumeration(&self, ty: SourceTypeId) -> bool;

    /// Whether values of the type can never be absent (e.g. unboxed numerics).
    fn is_primitive(&self, ty: SourceTypeId) -> bool;

    /// Declared properties, in declaration order.
    fn properties(&self, ty: SourceTypeId) -> Vec<RawProperty>;

    fn superclass(&self, ty: SourceTypeId) -> Option<SourceTypeId>;

    /// Declared permitted subtypes, in declaration order.
    fn subclasses(&self, ty: SourceTypeId) -> Vec<SourceTypeId>;

    /// Constants of an enumeration type, in declaration order.
    fn enumeration_constants(&self, ty: SourceTypeId) -> Vec<EnumConstant>;
}

/// Failure raised by a [`TypeMerger`] for an incompatible set of leaf types.
///
/// Propagated through the build unchanged, as the policy is the caller's.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct MergePolicyError {
    pub message: String,
}

impl MergePolicyError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Policy deciding the merged concrete type for a set of contributing leaf
/// types. Expected to be associative and commutative over the set; allowed to
/// fail when the contributors cannot be reconciled.
pub trait TypeMerger {
    fn merge(&self, types: &[SourceTypeId]) -> Result<SourceTypeId, MergePolicyError>;
}
