//! Choosing which upstream file a tag refers to.

use super::tag::ManifestTag;
use crate::config::ManifestConfig;
use crate::upstream::FileEntry;

/// Position of `label` in the `latest` preference list, if eligible.
fn preference_rank(label: &str) -> Option<usize> {
    ManifestConfig::PREFERRED_QUANTS
        .iter()
        .position(|preferred| *preferred == label)
}

/// Pick the file served for `tag`.
///
/// Only whole `.gguf` files are considered. An explicit quant matches the first
/// file with that label, ignoring case. `latest` takes the smallest file among
/// the preferred quants; equal sizes go to the more preferred quant.
pub fn select_model_file<'a>(files: &'a [FileEntry], tag: &ManifestTag) -> Option<&'a FileEntry> {
    let mut servable = files.iter().filter(|file| file.is_servable_model());

    if tag.is_latest() {
        servable
            .filter_map(|file| preference_rank(&file.quant_label()).map(|rank| (file, rank)))
            .min_by_key(|(file, rank)| (file.size, *rank))
            .map(|(file, _)| file)
    } else {
        let wanted = tag.quant.to_uppercase();
        servable.find(|file| file.quant_label() == wanted)
    }
}
