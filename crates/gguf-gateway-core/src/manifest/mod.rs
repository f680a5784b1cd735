//! Registry manifests synthesized from upstream GGUF repositories.

mod resolver;
mod select;
mod tag;
mod types;

pub use resolver::ManifestResolver;
pub use select::select_model_file;
pub use tag::ManifestTag;
pub use types::{Descriptor, ManifestDocument, MediaType, ModelConfig, RootFs};
