use sea_orm::DatabaseConnection;
use thiserror::Error;
use tracing::info;
use zel_core::prelude::*;

use crate::{
    auth::{self, CredentialError},
    entity::prelude::*,
    ids::UserId,
};

#[derive(Debug, Error)]
pub enum ProfilesServiceError {
    #[error("fatal database error")]
    DbError(#[from] DbErr),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("profile not found")]
    ProfileNotFound,

    #[error("username already taken")]
    UsernameTaken,

    #[error("not signed in")]
    Unauthenticated,
}

impl From<ProfilesServiceError> for ResourceError {
    fn from(error: ProfilesServiceError) -> Self {
        match error {
            ProfilesServiceError::DbError(error) => ResourceError::infra(error),
            ProfilesServiceError::Credential(_) => ResourceError::app(error),
            ProfilesServiceError::ProfileNotFound => ResourceError::app(error),
            ProfilesServiceError::UsernameTaken => ResourceError::app(error),
            ProfilesServiceError::Unauthenticated => ResourceError::app(error),
        }
    }
}

#[derive(Clone)]
pub struct ProfilesService {
    db: DatabaseConnection,
}

impl ProfilesService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn _get_profile(&self, user_id: UserId) -> Result<ProfileModel, ProfilesServiceError> {
        Profile::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or(ProfilesServiceError::ProfileNotFound)
    }

    /// Rename a profile. Keeping the current name changes nothing.
    pub async fn _update_username(
        &self,
        user_id: UserId,
        username: String,
    ) -> Result<ProfileModel, ProfilesServiceError> {
        let username = auth::validate_username(&username)?;
        let profile = self._get_profile(user_id).await?;

        if profile.username == username {
            return Ok(profile);
        }

        let taken = Profile::find()
            .filter(ProfileColumn::Username.eq(username.as_str()))
            .one(&self.db)
            .await?
            .is_some();
        if taken {
            return Err(ProfilesServiceError::UsernameTaken);
        }

        let mut profile: ProfileActiveModel = profile.into();
        profile.username = Set(username);
        profile.updated_at = Set(crate::time::now());
        let profile = profile.update(&self.db).await?;

        info!(%user_id, username = %profile.username, "username changed");
        Ok(profile)
    }

    async fn caller(&self, ctx: &RequestContext) -> Result<UserId, ProfilesServiceError> {
        super::session_user(&self.db, &ctx.connection().remote_id())
            .await?
            .ok_or(ProfilesServiceError::Unauthenticated)
    }
}

#[zel_service(name = "profiles")]
trait Profiles {
    #[method(name = "get_profile")]
    async fn get_profile(&self, user_id: UserId) -> Result<ProfileModel, ResourceError>;

    #[doc = "Profile of the signed-in user"]
    #[method(name = "my_profile")]
    async fn my_profile(&self) -> Result<ProfileModel, ResourceError>;

    #[doc = "Change the signed-in user's username"]
    #[method(name = "update_username")]
    async fn update_username(&self, username: String) -> Result<ProfileModel, ResourceError>;
}

#[async_trait]
impl ProfilesServer for ProfilesService {
    async fn get_profile(
        &self,
        _ctx: RequestContext,
        user_id: UserId,
    ) -> Result<ProfileModel, ResourceError> {
        Ok(self._get_profile(user_id).await?)
    }

    async fn my_profile(&self, ctx: RequestContext) -> Result<ProfileModel, ResourceError> {
        let user_id = self.caller(&ctx).await?;
        Ok(self._get_profile(user_id).await?)
    }

    async fn update_username(
        &self,
        ctx: RequestContext,
        username: String,
    ) -> Result<ProfileModel, ResourceError> {
        let user_id = self.caller(&ctx).await?;
        Ok(self._update_username(user_id, username).await?)
    }
}
