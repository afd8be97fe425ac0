//! Build configuration, assembled once and immutable for the whole run.

use crate::group::SubtypeGrouping;
use crate::normalize::NormalizerKind;
use crate::reflect::{Reflector, SourceTypeId, TypeMerger};

/// Filter applied once to every property discovered on a branch type.
/// Returning `false` drops the property before any recursion into its value.
pub type PropertyFilter = Box<dyn Fn(SourceTypeId, &str) -> bool>;

/// Everything one `unify` call needs, fixed up front.
///
/// Constructed with [`UnifyConfig::new`] plus consuming `with_*` setters; the
/// value never changes once the build starts.
pub struct UnifyConfig<'a> {
    pub(crate) reflector: &'a dyn Reflector,
    pub(crate) merger: &'a dyn TypeMerger,
    pub(crate) property_filter: Option<PropertyFilter>,
    pub(crate) normalizers: Vec<NormalizerKind>,
    pub(crate) grouping: SubtypeGrouping,
}

impl<'a> UnifyConfig<'a> {
    pub fn new(reflector: &'a dyn Reflector, merger: &'a dyn TypeMerger) -> Self {
        Self {
            reflector,
            merger,
            property_filter: None,
            normalizers: vec![NormalizerKind::Default],
            grouping: SubtypeGrouping::ByTypeName,
        }
    }

    pub fn with_property_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(SourceTypeId, &str) -> bool + 'static,
    {
        self.property_filter = Some(Box::new(filter));
        self
    }

    /// Replace the normalizer chain. Passes apply left-to-right; the empty
    /// chain is the identity.
    pub fn with_normalizers(mut self, normalizers: Vec<NormalizerKind>) -> Self {
        self.normalizers = normalizers;
        self
    }

    pub fn with_grouping(mut self, grouping: SubtypeGrouping) -> Self {
        self.grouping = grouping;
        self
    }

    pub(crate) fn keep_property(&self, declaring: SourceTypeId, name: &str) -> bool {
        match &self.property_filter {
            Some(filter) => filter(declaring, name),
            None => true,
        }
    }
}
