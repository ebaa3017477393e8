use bytes::Bytes;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use zel_core::prelude::*;

use crate::{
    ids::UserId,
    storage::{BlobStore, StorageError, AVATAR_BUCKET},
};

#[derive(Debug, Error)]
pub enum AvatarsServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("fatal database error")]
    DbError(#[from] sea_orm::DbErr),

    #[error("invalid file name")]
    InvalidFilename,

    #[error("avatars must be images, got {0}")]
    NotAnImage(String),

    #[error("avatar is {size} bytes, limit is {limit}")]
    TooLarge { size: u64, limit: u64 },

    #[error("empty upload")]
    Empty,

    #[error("not signed in")]
    Unauthenticated,
}

impl From<AvatarsServiceError> for ResourceError {
    fn from(error: AvatarsServiceError) -> Self {
        match error {
            AvatarsServiceError::Storage(StorageError::DbError(error)) => {
                ResourceError::infra(error)
            }
            AvatarsServiceError::Storage(_) => ResourceError::app(error),
            AvatarsServiceError::DbError(error) => ResourceError::infra(error),
            AvatarsServiceError::InvalidFilename => ResourceError::app(error),
            AvatarsServiceError::NotAnImage(_) => ResourceError::app(error),
            AvatarsServiceError::TooLarge { .. } => ResourceError::app(error),
            AvatarsServiceError::Empty => ResourceError::app(error),
            AvatarsServiceError::Unauthenticated => ResourceError::app(error),
        }
    }
}

/// A short-lived link to one of a user's avatars.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarUrl {
    pub filename: String,
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarBlob {
    pub content_type: String,
    pub data: Bytes,
}

/// A single path segment: no separators, no dot-dot, nothing that would
/// break the signed URL query.
fn check_filename(filename: &str) -> Result<&str, AvatarsServiceError> {
    let ok = !filename.is_empty()
        && filename.len() <= 255
        && !filename.contains(['/', '\\', '?', '#', '&'])
        && !filename.contains("..")
        && !filename.chars().any(char::is_control);

    if ok {
        Ok(filename)
    } else {
        Err(AvatarsServiceError::InvalidFilename)
    }
}

fn avatar_path(user_id: UserId, filename: &str) -> String {
    format!("{}/{filename}", user_id.storage_folder())
}

#[derive(Clone)]
pub struct AvatarsService {
    db: DatabaseConnection,
    store: BlobStore,
    max_bytes: u64,
}

impl AvatarsService {
    pub fn new(db: DatabaseConnection, store: BlobStore, max_bytes: u64) -> Self {
        Self {
            db,
            store,
            max_bytes,
        }
    }

    /// Store an avatar under the user's folder, replacing a file of the
    /// same name, and hand back a fresh signed URL.
    pub async fn _upload_avatar(
        &self,
        user_id: UserId,
        filename: String,
        content_type: String,
        data: Bytes,
    ) -> Result<AvatarUrl, AvatarsServiceError> {
        let filename = check_filename(filename.trim())?.to_string();

        if !content_type.starts_with("image/") {
            warn!(%user_id, %content_type, "rejected non-image avatar");
            return Err(AvatarsServiceError::NotAnImage(content_type));
        }
        if data.is_empty() {
            return Err(AvatarsServiceError::Empty);
        }
        let size = data.len() as u64;
        if size > self.max_bytes {
            warn!(%user_id, size, "rejected oversized avatar");
            return Err(AvatarsServiceError::TooLarge {
                size,
                limit: self.max_bytes,
            });
        }

        let path = avatar_path(user_id, &filename);
        self.store
            .put(AVATAR_BUCKET, &path, &content_type, data.to_vec())
            .await?;

        info!(%user_id, %filename, size, "avatar uploaded");
        Ok(AvatarUrl {
            url: self.store.signed_url(AVATAR_BUCKET, &path),
            filename,
        })
    }

    /// Signed URL for an avatar the user already uploaded
    pub async fn _signed_avatar_url(
        &self,
        user_id: UserId,
        filename: String,
    ) -> Result<AvatarUrl, AvatarsServiceError> {
        let filename = check_filename(filename.trim())?.to_string();
        let path = avatar_path(user_id, &filename);

        // missing objects are reported here, not when the URL is used
        self.store.get(AVATAR_BUCKET, &path).await?;

        Ok(AvatarUrl {
            url: self.store.signed_url(AVATAR_BUCKET, &path),
            filename,
        })
    }

    /// Most recently updated avatar, or `None` if the folder is empty
    pub async fn _current_avatar(
        &self,
        user_id: UserId,
    ) -> Result<Option<AvatarUrl>, AvatarsServiceError> {
        let folder = user_id.storage_folder();
        let objects = self.store.list_folder(AVATAR_BUCKET, &folder).await?;

        let Some(latest) = objects.into_iter().next() else {
            debug!(%user_id, "no avatar");
            return Ok(None);
        };

        let filename = latest
            .path
            .strip_prefix(&format!("{folder}/"))
            .unwrap_or(&latest.path)
            .to_string();

        Ok(Some(AvatarUrl {
            url: self.store.signed_url(AVATAR_BUCKET, &latest.path),
            filename,
        }))
    }

    /// Bytes behind a signed URL, if it is genuine and not expired
    pub async fn _fetch_signed(&self, url: String) -> Result<AvatarBlob, AvatarsServiceError> {
        let object = self.store.fetch_signed(&url).await?;

        Ok(AvatarBlob {
            content_type: object.content_type,
            data: Bytes::from(object.data),
        })
    }

    async fn caller(&self, ctx: &RequestContext) -> Result<UserId, AvatarsServiceError> {
        super::session_user(&self.db, &ctx.connection().remote_id())
            .await?
            .ok_or(AvatarsServiceError::Unauthenticated)
    }
}

#[zel_service(name = "avatars")]
trait Avatars {
    #[doc = "Upload an avatar for the signed-in user"]
    #[method(name = "upload_avatar")]
    async fn upload_avatar(
        &self,
        filename: String,
        content_type: String,
        data: Bytes,
    ) -> Result<AvatarUrl, ResourceError>;

    #[method(name = "signed_avatar_url")]
    async fn signed_avatar_url(&self, filename: String) -> Result<AvatarUrl, ResourceError>;

    #[doc = "Signed URL of a user's latest avatar"]
    #[method(name = "current_avatar")]
    async fn current_avatar(&self, user_id: UserId) -> Result<Option<AvatarUrl>, ResourceError>;

    #[method(name = "fetch_signed")]
    async fn fetch_signed(&self, url: String) -> Result<AvatarBlob, ResourceError>;
}

#[async_trait]
impl AvatarsServer for AvatarsService {
    async fn upload_avatar(
        &self,
        ctx: RequestContext,
        filename: String,
        content_type: String,
        data: Bytes,
    ) -> Result<AvatarUrl, ResourceError> {
        let user_id = self.caller(&ctx).await?;
        Ok(self
            ._upload_avatar(user_id, filename, content_type, data)
            .await?)
    }

    async fn signed_avatar_url(
        &self,
        ctx: RequestContext,
        filename: String,
    ) -> Result<AvatarUrl, ResourceError> {
        let user_id = self.caller(&ctx).await?;
        Ok(self._signed_avatar_url(user_id, filename).await?)
    }

    async fn current_avatar(
        &self,
        _ctx: RequestContext,
        user_id: UserId,
    ) -> Result<Option<AvatarUrl>, ResourceError> {
        Ok(self._current_avatar(user_id).await?)
    }

    async fn fetch_signed(&self, _ctx: RequestContext, url: String) -> Result<AvatarBlob, ResourceError> {
        Ok(self._fetch_signed(url).await?)
    }
}
