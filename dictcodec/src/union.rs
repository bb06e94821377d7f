//! Union resolver: ordered, trial-based selection among union variants.
//!
//! Variants are tried in declaration order. A trial fails when the variant's
//! transform raises a recoverable [`ValueError`]; any other error ends the
//! resolution immediately. Nothing is remembered between calls.

use std::sync::Arc;

use tracing::trace;

use crate::category::TypeCategory;
use crate::config::Options;
use crate::decode::DecodeFn;
use crate::encode::EncodeFn;
use crate::error::{ConversionError, ValueError};
use crate::tree::TreeValue;
use crate::value::Value;

fn exhausted(field: &str, categories: impl Iterator<Item = String>) -> ValueError {
    ValueError::nested(ConversionError::UnionResolutionFailure {
        field: field.to_owned(),
        attempted: categories.collect(),
    })
}

pub(crate) struct UnionEncoder {
    field: Arc<str>,
    variants: Vec<(TypeCategory, EncodeFn)>,
}

impl UnionEncoder {
    pub(crate) fn new(field: Arc<str>, variants: Vec<(TypeCategory, EncodeFn)>) -> Self {
        Self { field, variants }
    }

    /// Encode with the first variant that admits the value and succeeds.
    pub(crate) fn encode(&self, value: &Value, options: &Options) -> Result<TreeValue, ValueError> {
        for (category, transform) in &self.variants {
            if !category.admits(value) {
                continue;
            }
            match transform(value, options) {
                Ok(tree) => return Ok(tree),
                Err(err) if err.is_recoverable() => {
                    trace!(field = %self.field, variant = %category, error = %err, "union encode trial failed");
                }
                Err(err) => return Err(err),
            }
        }
        Err(exhausted(
            &self.field,
            self.variants.iter().map(|(category, _)| category.to_string()),
        ))
    }
}

pub(crate) struct UnionDecoder {
    field: Arc<str>,
    variants: Vec<(TypeCategory, DecodeFn)>,
}

impl UnionDecoder {
    pub(crate) fn new(field: Arc<str>, variants: Vec<(TypeCategory, DecodeFn)>) -> Self {
        Self { field, variants }
    }

    /// Decode with the first variant that succeeds and yields a value of its
    /// own category.
    pub(crate) fn decode(&self, tree: &TreeValue, options: &Options) -> Result<Value, ValueError> {
        for (category, transform) in &self.variants {
            match transform(tree, options) {
                Ok(value) if category.admits(&value) => return Ok(value),
                Ok(value) => {
                    trace!(field = %self.field, variant = %category, found = value.kind(), "union decode produced a foreign value");
                }
                Err(err) if err.is_recoverable() => {
                    trace!(field = %self.field, variant = %category, error = %err, "union decode trial failed");
                }
                Err(err) => return Err(err),
            }
        }
        Err(exhausted(
            &self.field,
            self.variants.iter().map(|(category, _)| category.to_string()),
        ))
    }
}
