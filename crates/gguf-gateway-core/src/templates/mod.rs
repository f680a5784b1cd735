//! Prompt templates matched to models by their embedded chat template.

mod registry;

pub use registry::{TemplateEntry, TemplateRegistry};
