//! Identifier normalization and multi-part name resolution.

pub mod normalizer;
pub mod resolver;

pub use normalizer::{
    decode_identifier, encode_identifier, normalize_name, NormalizeOptions, Normalizer,
};
pub use resolver::{
    database_part, object_part, schema_part, server_part, NameResolver, ObjectContext,
    BATCH_CONTEXT, DEFAULT_SCHEMA,
};
