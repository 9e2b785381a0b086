// src/store.rs
//! Injected storage collaborators: a blob store for the published news
//! document and a document store for quota state and contact submissions.
//! Filesystem-backed implementations serve the deployed binary; in-memory
//! ones back the tests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

/// Key/value storage for whole JSON documents (the `news.json` blob).
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<String>>;
    async fn write(&self, key: &str, content: &str) -> Result<()>;
}

/// Record storage: addressable documents plus append-only collections
/// with generated ids.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, doc_id: &str) -> Result<Option<Value>>;
    async fn set(&self, doc_id: &str, doc: &Value) -> Result<()>;
    async fn add(&self, collection: &str, record: &Value) -> Result<String>;
}

/// Short hex id for appended records, derived from wall clock + a process
/// sequence so concurrent adds within one invocation stay distinct.
fn generate_id() -> String {
    use sha2::{Digest, Sha256};
    static SEQ: AtomicU64 = AtomicU64::new(0);

    let seq = SEQ.fetch_add(1, Ordering::Relaxed);
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(nanos.to_le_bytes());
    hasher.update(seq.to_le_bytes());
    let digest = hasher.finalize();

    let mut out = String::with_capacity(20);
    for b in digest.iter().take(10) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/* ----------------------------
Filesystem-backed stores
---------------------------- */

pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("creating blob store dir {}", root.display()))?;
        Ok(Self { root })
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.root.join(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading blob {}", path.display())),
        }
    }

    async fn write(&self, key: &str, content: &str) -> Result<()> {
        // Write-then-rename so readers never observe a partial document.
        let path = self.root.join(key);
        let tmp = self.root.join(format!("{key}.tmp"));
        tokio::fs::write(&tmp, content)
            .await
            .with_context(|| format!("writing blob {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("publishing blob {}", path.display()))?;
        Ok(())
    }
}

pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("creating document store dir {}", root.display()))?;
        Ok(Self { root })
    }

    async fn write_json(&self, path: PathBuf, doc: &Value) -> Result<()> {
        let body = serde_json::to_string_pretty(doc).context("serializing document")?;
        let tmp = path.with_file_name(format!(
            "{}.tmp",
            path.file_name().and_then(|n| n.to_str()).unwrap_or("doc")
        ));
        tokio::fs::write(&tmp, body)
            .await
            .with_context(|| format!("writing document {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("publishing document {}", path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn get(&self, doc_id: &str) -> Result<Option<Value>> {
        let path = self.root.join(format!("{doc_id}.json"));
        match tokio::fs::read_to_string(&path).await {
            Ok(s) => {
                let v = serde_json::from_str(&s)
                    .with_context(|| format!("parsing document {}", path.display()))?;
                Ok(Some(v))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading document {}", path.display())),
        }
    }

    async fn set(&self, doc_id: &str, doc: &Value) -> Result<()> {
        self.write_json(self.root.join(format!("{doc_id}.json")), doc)
            .await
    }

    async fn add(&self, collection: &str, record: &Value) -> Result<String> {
        let dir = self.root.join(collection);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("creating collection dir {}", dir.display()))?;
        let id = generate_id();
        self.write_json(dir.join(format!("{id}.json")), record).await?;
        Ok(id)
    }
}

/* ----------------------------
In-memory stores (tests, local runs)
---------------------------- */

#[derive(Default)]
pub struct MemoryBlobStore {
    inner: RwLock<HashMap<String, String>>,
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.inner.read().await.get(key).cloned())
    }

    async fn write(&self, key: &str, content: &str) -> Result<()> {
        self.inner
            .write()
            .await
            .insert(key.to_string(), content.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryDocumentStore {
    docs: RwLock<HashMap<String, Value>>,
    collections: RwLock<HashMap<String, Vec<(String, Value)>>>,
}

impl MemoryDocumentStore {
    /// Snapshot of a collection's `(id, record)` pairs, in insertion order.
    pub async fn collection(&self, name: &str) -> Vec<(String, Value)> {
        self.collections
            .read()
            .await
            .get(name)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, doc_id: &str) -> Result<Option<Value>> {
        Ok(self.docs.read().await.get(doc_id).cloned())
    }

    async fn set(&self, doc_id: &str, doc: &Value) -> Result<()> {
        self.docs
            .write()
            .await
            .insert(doc_id.to_string(), doc.clone());
        Ok(())
    }

    async fn add(&self, collection: &str, record: &Value) -> Result<String> {
        let id = generate_id();
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .push((id.clone(), record.clone()));
        Ok(id)
    }
}
