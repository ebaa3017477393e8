//! Private object storage kept in the `storage_object` table.
//!
//! Objects are never handed out directly. Callers get a `storage://` URL
//! carrying an expiry and an HMAC-SHA256 token; [`BlobStore::fetch_signed`]
//! only returns bytes for a URL that verifies and has not expired.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use sea_orm::sea_query::OnConflict;
use sha2::Sha256;
use thiserror::Error;

use crate::entity::prelude::*;

pub const AVATAR_BUCKET: &str = "private-avatars";

/// Shortest signing key [`UrlSigner::new`] accepts.
pub const MIN_KEY_LEN: usize = 16;

const SCHEME: &str = "storage://";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("fatal database error")]
    DbError(#[from] DbErr),

    #[error("object not found")]
    NotFound,

    #[error("malformed signed url")]
    MalformedUrl,

    #[error("signed url expired")]
    Expired,

    #[error("signature mismatch")]
    BadSignature,

    #[error("signing key must be at least {MIN_KEY_LEN} bytes")]
    WeakKey,
}

/// A URL that was minted by [`UrlSigner::sign`] and has been split back
/// into its parts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedLocation {
    pub bucket: String,
    pub path: String,
    pub expires: i64,
}

#[derive(Clone)]
pub struct UrlSigner {
    keyed: HmacSha256,
    ttl_secs: i64,
}

impl UrlSigner {
    pub fn new(key: &[u8], ttl_secs: u64) -> Result<Self, StorageError> {
        if key.len() < MIN_KEY_LEN {
            return Err(StorageError::WeakKey);
        }
        let keyed = HmacSha256::new_from_slice(key).map_err(|_| StorageError::WeakKey)?;

        Ok(Self {
            keyed,
            ttl_secs: i64::try_from(ttl_secs).unwrap_or(i64::MAX),
        })
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    pub fn sign(&self, bucket: &str, path: &str) -> String {
        self.sign_at(bucket, path, chrono::Utc::now().timestamp())
    }

    pub fn sign_at(&self, bucket: &str, path: &str, now: i64) -> String {
        let expires = now.saturating_add(self.ttl_secs);
        let token = URL_SAFE_NO_PAD.encode(self.mac(bucket, path, expires).finalize().into_bytes());
        format!("{SCHEME}{bucket}/{path}?expires={expires}&token={token}")
    }

    pub fn verify(&self, url: &str) -> Result<SignedLocation, StorageError> {
        self.verify_at(url, chrono::Utc::now().timestamp())
    }

    pub fn verify_at(&self, url: &str, now: i64) -> Result<SignedLocation, StorageError> {
        let rest = url.strip_prefix(SCHEME).ok_or(StorageError::MalformedUrl)?;
        let (location, query) = rest.rsplit_once('?').ok_or(StorageError::MalformedUrl)?;
        let (bucket, path) = location.split_once('/').ok_or(StorageError::MalformedUrl)?;
        if bucket.is_empty() || path.is_empty() {
            return Err(StorageError::MalformedUrl);
        }

        let mut expires = None;
        let mut token = None;
        for pair in query.split('&') {
            match pair.split_once('=') {
                Some(("expires", v)) => expires = v.parse::<i64>().ok(),
                Some(("token", v)) => token = URL_SAFE_NO_PAD.decode(v).ok(),
                _ => return Err(StorageError::MalformedUrl),
            }
        }
        let expires = expires.ok_or(StorageError::MalformedUrl)?;
        let token = token.ok_or(StorageError::MalformedUrl)?;

        self.mac(bucket, path, expires)
            .verify_slice(&token)
            .map_err(|_| StorageError::BadSignature)?;
        if now >= expires {
            return Err(StorageError::Expired);
        }

        Ok(SignedLocation {
            bucket: bucket.to_string(),
            path: path.to_string(),
            expires,
        })
    }

    // HMAC-SHA256 over "bucket\npath\nexpires"
    fn mac(&self, bucket: &str, path: &str, expires: i64) -> HmacSha256 {
        let mut mac = self.keyed.clone();
        mac.update(bucket.as_bytes());
        mac.update(b"\n");
        mac.update(path.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        mac
    }
}

/// Object store over the shared database connection.
#[derive(Clone)]
pub struct BlobStore {
    db: DatabaseConnection,
    signer: UrlSigner,
}

impl BlobStore {
    pub fn new(db: DatabaseConnection, signer: UrlSigner) -> Self {
        Self { db, signer }
    }

    pub fn signer(&self) -> &UrlSigner {
        &self.signer
    }

    /// Writes (or overwrites) the object at `bucket/path`.
    pub async fn put(
        &self,
        bucket: &str,
        path: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<StorageObjectModel, StorageError> {
        let now = crate::time::now();
        let object = StorageObjectActiveModel {
            bucket: Set(bucket.to_string()),
            path: Set(path.to_string()),
            content_type: Set(content_type.to_string()),
            size: Set(data.len() as i64),
            data: Set(data),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        };

        StorageObject::insert(object)
            .on_conflict(
                OnConflict::columns([StorageObjectColumn::Bucket, StorageObjectColumn::Path])
                    .update_columns([
                        StorageObjectColumn::ContentType,
                        StorageObjectColumn::Size,
                        StorageObjectColumn::Data,
                        StorageObjectColumn::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;

        self.get(bucket, path).await
    }

    pub async fn get(&self, bucket: &str, path: &str) -> Result<StorageObjectModel, StorageError> {
        StorageObject::find_by_id((bucket.to_string(), path.to_string()))
            .one(&self.db)
            .await?
            .ok_or(StorageError::NotFound)
    }

    /// Objects directly under `folder/`, most recently updated first.
    pub async fn list_folder(
        &self,
        bucket: &str,
        folder: &str,
    ) -> Result<Vec<StorageObjectModel>, StorageError> {
        let prefix = format!("{folder}/");
        let objects = StorageObject::find()
            .filter(StorageObjectColumn::Bucket.eq(bucket))
            .filter(StorageObjectColumn::Path.starts_with(&prefix))
            .order_by_desc(StorageObjectColumn::UpdatedAt)
            .order_by_desc(StorageObjectColumn::Path)
            .all(&self.db)
            .await?;

        // starts_with is a LIKE; drop nested paths and wildcard hits
        Ok(objects
            .into_iter()
            .filter(|o| {
                o.path
                    .strip_prefix(&prefix)
                    .is_some_and(|name| !name.is_empty() && !name.contains('/'))
            })
            .collect())
    }

    pub fn signed_url(&self, bucket: &str, path: &str) -> String {
        self.signer.sign(bucket, path)
    }

    /// Resolves a signed URL to the stored object.
    pub async fn fetch_signed(&self, url: &str) -> Result<StorageObjectModel, StorageError> {
        let location = self.signer.verify(url)?;
        self.get(&location.bucket, &location.path).await
    }
}
