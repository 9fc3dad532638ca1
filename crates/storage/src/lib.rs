//! Compressed on-disk blob storage for the Knox resource cache.

pub mod blob;
pub mod error;

pub use blob::{BlobReader, BlobSizes, BlobStore, BlobWriter, ByteStream};
pub use error::{StorageError, StorageResult};
