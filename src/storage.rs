use std::{collections::HashMap, path::PathBuf};

use anyhow::Context;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use axum::async_trait;
use bytes::Bytes;
use tokio::{io::AsyncWriteExt, sync::RwLock};

use crate::config::S3Config;

/// Object storage for recipe images. `put_object` returns the reference
/// that gets persisted as the recipe's `image_url`; `delete_object` takes
/// that same reference back.
#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn put_object(&self, name: &str, body: Bytes, content_type: &str)
        -> anyhow::Result<String>;
    async fn delete_object(&self, reference: &str) -> anyhow::Result<()>;
}

/// Files under a directory on the local filesystem; references are paths.
#[derive(Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl StorageClient for LocalStorage {
    async fn put_object(
        &self,
        name: &str,
        body: Bytes,
        _content_type: &str,
    ) -> anyhow::Result<String> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("create upload dir {}", self.root.display()))?;
        let path = self.root.join(name);
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .with_context(|| format!("create {}", path.display()))?;
        file.write_all(&body)
            .await
            .with_context(|| format!("write {}", path.display()))?;
        file.flush().await?;
        Ok(path.to_string_lossy().into_owned())
    }

    async fn delete_object(&self, reference: &str) -> anyhow::Result<()> {
        match tokio::fs::remove_file(reference).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove {reference}")),
        }
    }
}

/// S3 / MinIO bucket; references are object keys.
#[derive(Clone)]
pub struct Storage {
    client: Client,
    bucket: String,
}

impl Storage {
    pub async fn new(cfg: &S3Config) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(Credentials::new(
                &cfg.access_key,
                &cfg.secret_key,
                None,
                None,
                "static",
            ))
            .endpoint_url(&cfg.endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(&cfg.endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            bucket: cfg.bucket.clone(),
        })
    }
}

#[async_trait]
impl StorageClient for Storage {
    async fn put_object(
        &self,
        name: &str,
        body: Bytes,
        content_type: &str,
    ) -> anyhow::Result<String> {
        let key = format!("recipes/{name}");
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .context("s3 put_object")?;
        Ok(key)
    }

    async fn delete_object(&self, reference: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(reference)
            .send()
            .await
            .context("s3 delete_object")?;
        Ok(())
    }
}

/// Keeps objects in a map. Used by `AppState::fake()`.
#[derive(Default)]
pub struct MemoryStorage {
    objects: RwLock<HashMap<String, Bytes>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, reference: &str) -> bool {
        self.objects.read().await.contains_key(reference)
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl StorageClient for MemoryStorage {
    async fn put_object(
        &self,
        name: &str,
        body: Bytes,
        _content_type: &str,
    ) -> anyhow::Result<String> {
        let reference = format!("memory/{name}");
        self.objects.write().await.insert(reference.clone(), body);
        Ok(reference)
    }

    async fn delete_object(&self, reference: &str) -> anyhow::Result<()> {
        self.objects
            .write()
            .await
            .remove(reference)
            .map(|_| ())
            .ok_or_else(|| anyhow::anyhow!("no such object: {reference}"))
    }
}
