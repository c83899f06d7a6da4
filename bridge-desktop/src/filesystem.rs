//! Filesystem-backed byte source and blob store using Tokio

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::BlobStore,
    stream::{ByteSource, ByteStream},
};
use bytes::{Bytes, BytesMut};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncReadExt;
use tracing::debug;

const DATA_EXT: &str = "dfpwm";
const KEY_EXT: &str = "key";
const DEFAULT_CHUNK_BYTES: usize = 64 * 1024;

/// Directory-backed blob store.
///
/// Each blob is stored as `<sha256(key)>.dfpwm`, with the original key kept in a
/// sidecar `<sha256(key)>.key` so [`list`](BlobStore::list) can return URLs.
/// Writes go through a temporary file and a rename so a crash never leaves a
/// truncated blob under its final name.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Store blobs under the platform cache directory.
    pub fn new() -> Self {
        let root = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("dfpwm-player")
            .join("tracks");

        Self { root }
    }

    /// Store blobs under a custom directory.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the blobs.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_stem(key: &str) -> String {
        hex::encode(Sha256::digest(key.as_bytes()))
    }

    fn data_path(&self, key: &str) -> PathBuf {
        self.root
            .join(format!("{}.{}", Self::file_stem(key), DATA_EXT))
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.{}", Self::file_stem(key), KEY_EXT))
    }

    async fn ensure_root(&self) -> Result<()> {
        if !fs::try_exists(&self.root).await? {
            fs::create_dir_all(&self.root).await?;
            debug!(path = ?self.root, "Created blob store directory");
        }
        Ok(())
    }
}

impl Default for FsBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Remove a file, treating "already gone" as success. Returns whether it existed.
async fn remove_if_present(path: &Path) -> Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(BridgeError::Io(e)),
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn has(&self, key: &str) -> Result<bool> {
        Ok(fs::try_exists(self.data_path(key)).await?)
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        match fs::read(self.data_path(key)).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BridgeError::Io(e)),
        }
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        self.ensure_root().await?;

        let final_path = self.data_path(key);
        let tmp_path = final_path.with_extension(format!("{}.tmp", DATA_EXT));
        fs::write(&tmp_path, &data).await?;
        fs::rename(&tmp_path, &final_path).await?;
        fs::write(self.key_path(key), key.as_bytes()).await?;

        debug!(bytes = data.len(), path = ?final_path, "Stored blob");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let existed = remove_if_present(&self.data_path(key)).await?;
        remove_if_present(&self.key_path(key)).await?;
        Ok(existed)
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(BridgeError::Io(e)),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(KEY_EXT) {
                continue;
            }
            let key = fs::read_to_string(&path).await?;
            if fs::try_exists(self.data_path(&key)).await? {
                keys.push(key);
            }
        }

        keys.sort();
        Ok(keys)
    }
}

/// Byte source reading local files.
///
/// Accepts plain paths or `file://` URLs.
pub struct FileByteSource {
    chunk_size: usize,
}

impl FileByteSource {
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_BYTES)
    }

    /// Read files in chunks of at most `chunk_size` bytes (minimum 1).
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    fn resolve(url: &str) -> PathBuf {
        PathBuf::from(url.strip_prefix("file://").unwrap_or(url))
    }
}

impl Default for FileByteSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ByteSource for FileByteSource {
    async fn open(&self, url: &str) -> Result<Box<dyn ByteStream>> {
        let path = Self::resolve(url);
        let file = fs::File::open(&path).await?;
        let len = file.metadata().await.ok().map(|m| m.len());
        debug!(path = ?path, len = ?len, "Opened file stream");

        Ok(Box::new(FileByteStream {
            file: Some(file),
            chunk_size: self.chunk_size,
            len,
        }))
    }
}

struct FileByteStream {
    file: Option<fs::File>,
    chunk_size: usize,
    len: Option<u64>,
}

#[async_trait]
impl ByteStream for FileByteStream {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        let Some(file) = self.file.as_mut() else {
            return Ok(None);
        };

        let mut buf = BytesMut::with_capacity(self.chunk_size);
        let read = file.read_buf(&mut buf).await?;
        if read == 0 {
            self.file = None;
            return Ok(None);
        }

        Ok(Some(buf.freeze()))
    }

    fn abort(&mut self) {
        self.file = None;
    }

    fn content_length(&self) -> Option<u64> {
        self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_blob_store_put_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::with_root(dir.path().join("blobs"));
        let url = "https://music.example.com/songs/intro.dfpwm?sig=abc";

        assert!(!store.has(url).await.unwrap());
        assert!(store.get(url).await.unwrap().is_none());
        assert!(store.list().await.unwrap().is_empty());

        store.put(url, Bytes::from_static(b"\x00\xff\x55")).await.unwrap();
        assert!(store.has(url).await.unwrap());
        assert_eq!(
            store.get(url).await.unwrap().unwrap(),
            Bytes::from_static(b"\x00\xff\x55")
        );
        assert_eq!(store.list().await.unwrap(), vec![url.to_string()]);

        assert!(store.delete(url).await.unwrap());
        assert!(!store.delete(url).await.unwrap());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blob_store_overwrite_and_list_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::with_root(dir.path());

        store.put("b", Bytes::from_static(b"1")).await.unwrap();
        store.put("a", Bytes::from_static(b"2")).await.unwrap();
        store.put("b", Bytes::from_static(b"3")).await.unwrap();

        assert_eq!(store.list().await.unwrap(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(store.get("b").await.unwrap().unwrap(), Bytes::from_static(b"3"));
    }

    #[tokio::test]
    async fn test_file_source_reads_in_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("track.dfpwm");
        std::fs::write(&path, [0u8, 1, 2, 3, 4, 5, 6]).unwrap();

        let source = FileByteSource::with_chunk_size(3);
        let url = format!("file://{}", path.display());
        let mut stream = source.open(&url).await.unwrap();
        assert_eq!(stream.content_length(), Some(7));

        let mut collected = Vec::new();
        while let Some(chunk) = stream.next_chunk().await.unwrap() {
            assert!(chunk.len() <= 3);
            collected.extend_from_slice(&chunk);
        }
        assert_eq!(collected, vec![0, 1, 2, 3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn test_file_source_missing_file() {
        let source = FileByteSource::new();
        assert!(source.open("/definitely/not/here.dfpwm").await.is_err());
    }

    #[tokio::test]
    async fn test_file_stream_abort() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("track.dfpwm");
        std::fs::write(&path, [0xAAu8; 16]).unwrap();

        let mut stream = FileByteSource::with_chunk_size(4)
            .open(path.to_str().unwrap())
            .await
            .unwrap();
        assert!(stream.next_chunk().await.unwrap().is_some());
        stream.abort();
        assert!(stream.next_chunk().await.unwrap().is_none());
    }
}
