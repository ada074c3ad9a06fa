//! Commons - general-purpose building blocks
//!
//! This crate bundles a thread-safe, multi-valued configuration container
//! with merge policies and several persistence formats, read-only views
//! over shared primitive collections, an explicit locale/time-zone context
//! and thin wrappers over digest and signature primitives.

pub mod collect;
pub mod context;

pub use commons_config as config;
pub use commons_security as security;

pub use collect::{
    CollectionError, IntoUnmodifiable, Primitive, PrimitiveCollection, PrimitiveIter, PrimitiveList,
    PrimitiveSequence, Unmodifiable, UnmodifiableList,
};
pub use commons_config::{
    Config, ConfigError, ConfigResult, ConfigView, MergeReport, MergingPolicy, Property,
    PropertyType, StackConfig, Value,
};
pub use commons_security::{DigestAlgorithm, KeyPair, KeyPairGenerator, Signer, Verifier};
pub use context::{parse_time_zone, ContextError, Locale, LocaleContext, TimeZoneSpec};
