//! Leaf transforms for feature pipelines and the process-wide component registry.
//!
//! Every transform here is a [`Transform`](repipe_pipeline::Transform) with a
//! stable class identifier under `repipe.transforms.*`. [`default_registry`]
//! resolves those identifiers together with the pipeline steps, so a saved
//! pipeline document can be loaded without further setup.

use std::sync::OnceLock;

use repipe_pipeline::{ComponentRegistry, register_builtin};

pub mod datetime;
pub mod dtype;
pub mod embeddings;
pub mod encoders;
pub mod hashing;
pub mod identity;
pub mod parallel;
pub mod sequence;
pub mod text;
pub mod tokenizer;

pub use datetime::{DatePart, DateTimePartExtractor};
pub use embeddings::{WordVectorEmbedder, WordVectors};
pub use encoders::{Categories, OneHotEncoderAdapter, OneHotEncodingToBinaryEncoding};
pub use hashing::{Analyzer, HashingVectorizerAdapter, TextHasher, stable_hash};
pub use identity::Identity;
pub use sequence::{PadSequencesAdapter, Side};
pub use text::{DEFAULT_SCRUB_FILTERS, TextFieldUnion, TextScrubber, word_tokenize};
pub use tokenizer::TokenizerAdapter;

static DEFAULT_REGISTRY: OnceLock<ComponentRegistry> = OnceLock::new();

/// Register the pipeline steps and every transform in this crate.
pub fn register_all(registry: &mut ComponentRegistry) {
    register_builtin(registry);
    registry.register(Identity::CLASS, Identity::build);
    registry.register(TextScrubber::CLASS, TextScrubber::build);
    registry.register(TextFieldUnion::CLASS, TextFieldUnion::build);
    registry.register(TokenizerAdapter::CLASS, TokenizerAdapter::build);
    registry.register(TextHasher::CLASS, TextHasher::build);
    registry.register(HashingVectorizerAdapter::CLASS, HashingVectorizerAdapter::build);
    registry.register(PadSequencesAdapter::CLASS, PadSequencesAdapter::build);
    registry.register(OneHotEncoderAdapter::CLASS, OneHotEncoderAdapter::build);
    registry.register(
        OneHotEncodingToBinaryEncoding::CLASS,
        OneHotEncodingToBinaryEncoding::build,
    );
    registry.register(DateTimePartExtractor::CLASS, DateTimePartExtractor::build);
    registry.register(WordVectorEmbedder::CLASS, WordVectorEmbedder::build);
}

/// Builds a registry with every known component.
pub fn build_default_registry() -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();
    register_all(&mut registry);
    registry
}

/// Get the process-wide registry, building it on first use.
pub fn default_registry() -> &'static ComponentRegistry {
    DEFAULT_REGISTRY.get_or_init(build_default_registry)
}
