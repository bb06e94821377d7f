//! Compiled codecs and the typed entry points.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::config::Options;
use crate::decode::{build_decoder, RecordDecoder};
use crate::encode::{build_encoder, RecordEncoder};
use crate::error::{ConversionError, SynthesisError};
use crate::schema::{self, RecordSchema};
use crate::traits::Record;
use crate::tree::{TreeMap, TreeValue};
use crate::types::RecordRef;
use crate::value::RecordValue;

/// The encode/decode pair synthesized for one record type.
///
/// Built once per record type by the [registry](crate::registry) and shared
/// from then on. Both directions are pure functions of their inputs and may
/// be called concurrently.
pub struct CompiledCodec {
    schema: Arc<RecordSchema>,
    encoder: RecordEncoder,
    decoder: RecordDecoder,
}

impl fmt::Debug for CompiledCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledCodec")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl CompiledCodec {
    /// Extract the schema of `record` and synthesize both directions.
    ///
    /// Prefer [`get_or_build`](crate::get_or_build), which caches the result.
    pub fn build(record: &RecordRef) -> Result<Self, SynthesisError> {
        let schema = Arc::new(schema::extract(record)?);
        debug!(
            record = record.name(),
            fields = schema.fields.len(),
            "synthesized record codec"
        );
        Ok(Self {
            encoder: build_encoder(Arc::clone(&schema)),
            decoder: build_decoder(Arc::clone(&schema)),
            schema,
        })
    }

    pub fn record(&self) -> &RecordRef {
        &self.schema.record
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    pub fn encode(&self, record: &RecordValue, options: &Options) -> Result<TreeValue, ConversionError> {
        self.encoder.encode(record, options).map(TreeValue::Map)
    }

    /// Like [`encode`](Self::encode), returning the map itself.
    pub fn encode_map(&self, record: &RecordValue, options: &Options) -> Result<TreeMap, ConversionError> {
        self.encoder.encode(record, options)
    }

    pub fn decode(&self, tree: TreeValue, options: &Options) -> Result<RecordValue, ConversionError> {
        self.decoder.decode(tree, options)
    }
}

/// Encode a typed record into a tree value.
pub fn to_tree<T: Record>(value: &T, options: &Options) -> Result<TreeValue, ConversionError> {
    T::codec()?.encode(&value.to_record(), options)
}

/// Decode a typed record from a tree value.
pub fn from_tree<T: Record>(tree: TreeValue, options: &Options) -> Result<T, ConversionError> {
    let record = T::codec()?.decode(tree, options)?;
    T::from_record(record)
}

/// Encode a typed record into JSON.
pub fn to_json<T: Record>(value: &T, options: &Options) -> Result<serde_json::Value, ConversionError> {
    Ok(to_tree(value, options)?.to_json()?)
}

/// Decode a typed record from JSON.
pub fn from_json<T: Record>(json: serde_json::Value, options: &Options) -> Result<T, ConversionError> {
    from_tree(TreeValue::from(json), options)
}
