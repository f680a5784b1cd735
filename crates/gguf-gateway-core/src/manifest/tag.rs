//! Client-supplied manifest tags.

use crate::config::ManifestConfig;

/// A tag split into its quant part and optional template override.
///
/// `q4_k_m--chatml` selects the `Q4_K_M` file and falls back to the `chatml`
/// template when the model's own chat template is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestTag {
    pub quant: String,
    /// Empty when the tag has no separator.
    pub template_override: String,
}

impl ManifestTag {
    pub fn parse(tag: &str) -> Self {
        if tag.contains(ManifestConfig::TAG_SEPARATOR) {
            let mut parts = tag.split(ManifestConfig::TAG_SEPARATOR);
            let quant = parts.next().unwrap_or_default().to_string();
            let template_override = parts.last().unwrap_or_default().to_string();
            Self {
                quant,
                template_override,
            }
        } else {
            Self {
                quant: tag.to_string(),
                template_override: String::new(),
            }
        }
    }

    pub fn is_latest(&self) -> bool {
        self.quant == ManifestConfig::LATEST_TAG
    }
}
