use thiserror::Error;

use crate::reflect::MergePolicyError;

/// Errors raised while building a unified description graph.
///
/// Construction is all-or-nothing: no partial graph is returned alongside any
/// of these. Everything here is deterministic, so the only recovery is a
/// different configuration and a fresh `unify` call.
#[derive(Error, Debug)]
pub enum UnifyError {
    #[error("no root types were supplied")]
    EmptyRoots,

    #[error("unsupported collection shape `{shape}` on property `{property}` of `{declaring}`")]
    UnsupportedShape {
        declaring: String,
        property: String,
        shape: String,
    },

    #[error("subtype `{subtype}` duplicates the key `{key}` within one source's subtype list")]
    AmbiguousSubtypeKey { subtype: String, key: String },

    #[error("enumeration `{enumeration}` maps two constants to the display name `{name}`")]
    DuplicateDisplayName { enumeration: String, name: String },

    #[error("type merge rejected: {0}")]
    Merge(#[from] MergePolicyError),

    #[error("computed structure disagrees with the predefined one: {0}")]
    PredefinedMismatch(String),

    #[error("internal error: {0}")]
    Internal(String),
}
