//! Client for the upstream model-hosting service (ModelScope).
//!
//! - [`types`] - API payloads, [`FileEntry`] and [`GgufMetadata`]
//! - [`modelscope`] - the cached [`ModelHub`] client

mod modelscope;
mod types;

pub use modelscope::ModelHub;
pub use types::{
    quant_label, FileEntry, FileListingData, FileListingResponse, GgufMetadata, MetadataRequest,
    MetadataResponse,
};
