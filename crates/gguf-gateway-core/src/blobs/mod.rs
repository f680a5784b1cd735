//! Blob storage addressed by digest.

mod store;

pub use store::{BlobRecord, BlobRequest, BlobResponse, BlobStore};
