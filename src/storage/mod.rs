//! Local object store for uploaded images, served back under `/uploads`.

use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use axum::{
    debug_handler,
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path as UrlPath, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::UnknownVariant,
    outcome::ActionError,
    session::Viewer,
    AppState,
};

/// Room for the multipart framing around the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Images,
    Avatars,
}

impl Bucket {
    pub const ALL: [Bucket; 2] = [Bucket::Images, Bucket::Avatars];

    pub fn as_str(self) -> &'static str {
        match self {
            Bucket::Images => "images",
            Bucket::Avatars => "avatars",
        }
    }
}

impl FromStr for Bucket {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Bucket::ALL
            .into_iter()
            .find(|bucket| bucket.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("bucket", s))
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid object key '{0}'")]
    InvalidKey(String),
    #[error("object exceeds {limit} bytes")]
    TooLarge { limit: usize },
    #[error("unsupported content type '{0}'")]
    UnsupportedType(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct ObjectStore {
    root: PathBuf,
    max_bytes: usize,
}

impl ObjectStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self { root: root.into(), max_bytes }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Writes `bytes` under `bucket/key` and returns the public URL.
    pub async fn upload(&self, bucket: Bucket, key: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let key_ok = !key.is_empty()
            && !key.starts_with('.')
            && key.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !key_ok {
            return Err(StorageError::InvalidKey(key.to_owned()));
        }
        if bytes.len() > self.max_bytes {
            return Err(StorageError::TooLarge { limit: self.max_bytes });
        }

        let dir = self.root.join(bucket.as_str());
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(key), bytes).await?;

        tracing::info!(%bucket, %key, size = bytes.len(), "object stored");
        Ok(Self::public_url(bucket, key))
    }

    pub fn public_url(bucket: Bucket, key: &str) -> String {
        format!("/uploads/{bucket}/{key}")
    }
}

/// File extension for the image types we accept.
fn image_extension(content_type: &str) -> Result<&'static str, StorageError> {
    match content_type {
        "image/png" => Ok("png"),
        "image/jpeg" => Ok("jpg"),
        "image/gif" => Ok("gif"),
        "image/webp" => Ok("webp"),
        other => Err(StorageError::UnsupportedType(other.to_owned())),
    }
}

impl From<StorageError> for ActionError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::TooLarge { .. } => ActionError::invalid("ファイルサイズが大きすぎます"),
            StorageError::UnsupportedType(_) => ActionError::invalid("画像ファイルを選択してください"),
            StorageError::InvalidKey(_) | StorageError::Io(_) => ActionError::Provider {
                context: "アップロードに失敗しました",
                source: err.into(),
            },
        }
    }
}

fn multipart_error(err: MultipartError, limit: usize) -> ActionError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        StorageError::TooLarge { limit }.into()
    } else {
        ActionError::invalid("アップロードに失敗しました")
    }
}

#[derive(Debug, Serialize)]
pub struct Uploaded {
    success: bool,
    url: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn upload(
    UrlPath(bucket): UrlPath<String>,
    State(objects): State<ObjectStore>,
    viewer: Viewer,
    mut multipart: Multipart,
) -> Result<Json<Uploaded>, ActionError> {
    let actor = viewer.require()?;
    let bucket: Bucket = bucket.parse().map_err(|_| ActionError::NotFound("保存先"))?;
    let limit = objects.max_bytes();

    while let Some(field) = multipart.next_field().await.map_err(|err| multipart_error(err, limit))? {
        if field.name() != Some("file") {
            continue;
        }

        let extension = image_extension(field.content_type().unwrap_or_default())?;
        let bytes = field.bytes().await.map_err(|err| multipart_error(err, limit))?;
        let key = format!("{}.{extension}", Uuid::now_v7());

        let url = objects.upload(bucket, &key, &bytes).await?;
        tracing::info!(by = %actor.id, %url, "upload accepted");
        return Ok(Json(Uploaded { success: true, url }));
    }

    Err(ActionError::invalid("ファイルを選択してください"))
}

pub fn router(max_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/upload/{bucket}", post(upload))
        .layer(DefaultBodyLimit::max(max_bytes + MULTIPART_OVERHEAD))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("hakkutsu-objects-{}", Uuid::now_v7()))
    }

    #[tokio::test]
    async fn upload_writes_file_and_returns_public_url() {
        let root = scratch_dir();
        let store = ObjectStore::new(root.clone(), 1024);

        let url = store.upload(Bucket::Images, "a.png", b"png").await.expect("stored");
        assert_eq!(url, "/uploads/images/a.png");
        assert_eq!(tokio::fs::read(root.join("images/a.png")).await.expect("readable"), b"png");

        tokio::fs::remove_dir_all(&root).await.ok();
    }

    #[tokio::test]
    async fn upload_rejects_traversal_and_oversize() {
        let store = ObjectStore::new(scratch_dir(), 4);

        assert!(matches!(
            store.upload(Bucket::Avatars, "../x.png", b"1").await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            store.upload(Bucket::Avatars, "x.png", b"12345").await,
            Err(StorageError::TooLarge { limit: 4 })
        ));
    }

    #[test]
    fn only_known_buckets_and_image_types() {
        assert_eq!("avatars".parse::<Bucket>().ok(), Some(Bucket::Avatars));
        assert!("private".parse::<Bucket>().is_err());
        assert_eq!(image_extension("image/webp").ok(), Some("webp"));
        assert!(image_extension("text/html").is_err());
    }
}
