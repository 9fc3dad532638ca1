//! Gzip-compressed blob files keyed by numeric resource id.
//!
//! One flat directory holds one file per resource, named by the decimal
//! id of its metadata row. Bodies are streamed through a gzip encoder on
//! the way in, so the uncompressed length (`raw_bytes`) and the file size
//! (`bytes_on_disk`) diverge. Writers land on a temp file and rename into
//! place at `finish()`, so a crashed fetcher never leaves a truncated
//! blob at the final path.

use crate::error::{StorageError, StorageResult};
use async_compression::tokio::bufread::GzipDecoder;
use async_compression::tokio::write::GzipEncoder;
use bytes::Bytes;
use futures::Stream;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tracing::instrument;
use uuid::Uuid;

/// Chunk size for streaming reads (64 KiB).
const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// A boxed stream of decompressed body bytes.
pub type ByteStream = Pin<Box<dyn Stream<Item = StorageResult<Bytes>> + Send>>;

/// Final sizes of a written blob.
#[derive(Debug, Clone, Copy)]
pub struct BlobSizes {
    /// Cumulative uncompressed bytes written.
    pub raw_bytes: u64,
    /// Size of the compressed file on disk.
    pub bytes_on_disk: u64,
}

/// Flat-directory blob store.
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Create a new blob store rooted at the given directory.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn blob_path(&self, id: i64) -> PathBuf {
        self.root.join(id.to_string())
    }

    /// Open a streaming writer for a new blob.
    #[instrument(skip(self))]
    pub async fn create(&self, id: i64) -> StorageResult<BlobWriter> {
        let final_path = self.blob_path(id);
        let temp_path = self.root.join(format!("{id}.tmp.{}", Uuid::new_v4()));
        let file = fs::File::create(&temp_path).await?;
        Ok(BlobWriter {
            encoder: Some(GzipEncoder::new(file)),
            raw_bytes: 0,
            temp_path,
            final_path,
        })
    }

    /// Open a streaming reader over an existing blob.
    #[instrument(skip(self))]
    pub async fn open(&self, id: i64) -> StorageResult<BlobReader> {
        let path = self.blob_path(id);
        let file = fs::File::open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(path.display().to_string())
            } else {
                StorageError::Io(e)
            }
        })?;
        Ok(BlobReader {
            decoder: GzipDecoder::new(BufReader::new(file)),
        })
    }

    /// Check whether a blob exists at its final path.
    pub async fn exists(&self, id: i64) -> StorageResult<bool> {
        Ok(fs::try_exists(&self.blob_path(id)).await?)
    }

    /// Verify the root directory is present and is a directory.
    pub async fn health_check(&self) -> StorageResult<()> {
        let meta = fs::metadata(&self.root).await?;
        if !meta.is_dir() {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::NotADirectory,
                format!("store root is not a directory: {}", self.root.display()),
            )));
        }
        Ok(())
    }
}

/// Streaming gzip writer for one blob.
///
/// `finish()` finalizes the gzip framing, fsyncs, and renames the temp
/// file into place; it must be called before the owning metadata row is
/// finalized. `abort()` discards the temp file.
pub struct BlobWriter {
    // Option so finish()/abort() can take the encoder despite Drop.
    encoder: Option<GzipEncoder<fs::File>>,
    raw_bytes: u64,
    temp_path: PathBuf,
    final_path: PathBuf,
}

impl BlobWriter {
    /// Write a chunk of uncompressed body bytes.
    pub async fn write(&mut self, data: &[u8]) -> StorageResult<()> {
        let encoder = self
            .encoder
            .as_mut()
            .ok_or_else(|| StorageError::Io(std::io::Error::other("writer already closed")))?;
        encoder.write_all(data).await?;
        self.raw_bytes += data.len() as u64;
        Ok(())
    }

    /// Cumulative uncompressed bytes written so far.
    pub fn raw_bytes(&self) -> u64 {
        self.raw_bytes
    }

    /// Finalize the blob and move it to its final path.
    pub async fn finish(mut self) -> StorageResult<BlobSizes> {
        let mut encoder = self
            .encoder
            .take()
            .ok_or_else(|| StorageError::Io(std::io::Error::other("writer already closed")))?;
        encoder.shutdown().await?;
        let file = encoder.into_inner();
        file.sync_all().await?;
        drop(file);

        fs::rename(&self.temp_path, &self.final_path).await?;
        let bytes_on_disk = fs::metadata(&self.final_path).await?.len();

        Ok(BlobSizes {
            raw_bytes: self.raw_bytes,
            bytes_on_disk,
        })
    }

    /// Discard the partially written blob.
    pub async fn abort(mut self) -> StorageResult<()> {
        self.encoder.take();
        let _ = fs::remove_file(&self.temp_path).await;
        Ok(())
    }
}

impl Drop for BlobWriter {
    fn drop(&mut self) {
        if self.encoder.is_some() {
            // Can't do async cleanup from Drop; the temp file stays until
            // an operator sweeps *.tmp.* from the store root.
            tracing::warn!(
                temp_path = %self.temp_path.display(),
                "blob writer dropped without finish() or abort()"
            );
        }
    }
}

/// Streaming gzip reader over one blob.
pub struct BlobReader {
    decoder: GzipDecoder<BufReader<fs::File>>,
}

impl BlobReader {
    /// Read and decompress the entire body into memory.
    pub async fn read_to_end(mut self) -> StorageResult<Vec<u8>> {
        let mut out = Vec::new();
        self.decoder.read_to_end(&mut out).await?;
        Ok(out)
    }

    /// Convert into a chunked stream of decompressed bytes, suitable for
    /// an HTTP response body.
    pub fn into_stream(mut self) -> ByteStream {
        let stream = async_stream::try_stream! {
            let mut buf = vec![0u8; STREAM_CHUNK_SIZE];
            loop {
                let n = self.decoder.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                yield Bytes::copy_from_slice(&buf[..n]);
            }
        };
        Box::pin(stream)
    }
}
