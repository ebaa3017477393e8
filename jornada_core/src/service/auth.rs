use iroh::PublicKey;
use sea_orm::{sea_query::OnConflict, ConnectionTrait, DatabaseConnection, TransactionTrait};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use zel_core::prelude::*;

use super::roles::RoleGate;
use crate::{
    auth::{self, password, CredentialError},
    entity::prelude::*,
    ids::UserId,
};

#[derive(Debug, Error)]
pub enum AuthServiceError {
    #[error("fatal database error")]
    DbError(#[from] DbErr),

    #[error("password hashing failed")]
    Password(#[from] password::PasswordError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("email already registered")]
    EmailTaken,

    #[error("username already taken")]
    UsernameTaken,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("user not found")]
    UserNotFound,

    #[error("not signed in")]
    Unauthenticated,
}

impl From<AuthServiceError> for ResourceError {
    fn from(error: AuthServiceError) -> Self {
        match error {
            AuthServiceError::DbError(error) => ResourceError::infra(error),
            AuthServiceError::Password(error) => ResourceError::infra(error),
            AuthServiceError::Credential(_) => ResourceError::app(error),
            AuthServiceError::EmailTaken => ResourceError::app(error),
            AuthServiceError::UsernameTaken => ResourceError::app(error),
            AuthServiceError::InvalidCredentials => ResourceError::app(error),
            AuthServiceError::UserNotFound => ResourceError::app(error),
            AuthServiceError::Unauthenticated => ResourceError::app(error),
        }
    }
}

/// Who is signed in on a node, and whether they may administer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub email: String,
    pub username: String,
    pub is_admin: bool,
}

#[derive(Clone)]
pub struct AuthService {
    db: DatabaseConnection,
    roles: RoleGate,
}

impl AuthService {
    pub fn new(db: DatabaseConnection, roles: RoleGate) -> Self {
        Self { db, roles }
    }

    /// Create an account with its profile and sign it in on `node_id`
    pub async fn _sign_up(
        &self,
        node_id: PublicKey,
        email: String,
        password: String,
        username: String,
    ) -> Result<Session, AuthServiceError> {
        let email = auth::normalize_email(&email)?;
        let username = auth::validate_username(&username)?;
        auth::validate_password(&password)?;
        let password_hash = password::hash_password(&password)?;

        let txn = self.db.begin().await?;

        let email_taken = AppUser::find()
            .filter(AppUserColumn::Email.eq(email.as_str()))
            .one(&txn)
            .await?
            .is_some();
        if email_taken {
            return Err(AuthServiceError::EmailTaken);
        }

        let username_taken = Profile::find()
            .filter(ProfileColumn::Username.eq(username.as_str()))
            .one(&txn)
            .await?
            .is_some();
        if username_taken {
            return Err(AuthServiceError::UsernameTaken);
        }

        let user_id = UserId::new();
        let now = crate::time::now();

        let user = AppUserActiveModel {
            id: Set(user_id),
            email: Set(email),
            password_hash: Set(password_hash),
            created_at: Set(now.clone()),
        };
        AppUser::insert(user).exec(&txn).await?;

        let profile = ProfileActiveModel {
            id: Set(user_id),
            username: Set(username),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        };
        Profile::insert(profile).exec(&txn).await?;

        bind_node(&txn, &node_id, user_id).await?;

        txn.commit().await?;
        info!(%user_id, "signed up");

        self.session_for(user_id).await
    }

    /// Check credentials and bind `node_id` to the account
    pub async fn _sign_in(
        &self,
        node_id: PublicKey,
        email: String,
        password: String,
    ) -> Result<Session, AuthServiceError> {
        let email = email.trim().to_lowercase();

        let user = AppUser::find()
            .filter(AppUserColumn::Email.eq(email.as_str()))
            .one(&self.db)
            .await?;

        let Some(user) = user else {
            warn!("sign in with unknown email");
            return Err(AuthServiceError::InvalidCredentials);
        };

        if !password::verify_password(&password, &user.password_hash)? {
            warn!(user_id = %user.id, "sign in with wrong password");
            return Err(AuthServiceError::InvalidCredentials);
        }

        bind_node(&self.db, &node_id, user.id).await?;
        info!(user_id = %user.id, "signed in");

        self.session_for(user.id).await
    }

    /// Forget whoever is signed in on `node_id`
    pub async fn _sign_out(&self, node_id: PublicKey) -> Result<(), AuthServiceError> {
        Identity::delete_by_id(node_id.as_bytes().to_vec())
            .exec(&self.db)
            .await?;

        debug!("signed out");
        Ok(())
    }

    pub async fn _current_session(
        &self,
        node_id: PublicKey,
    ) -> Result<Option<Session>, AuthServiceError> {
        match super::session_user(&self.db, &node_id).await? {
            Some(user_id) => Ok(Some(self.session_for(user_id).await?)),
            None => Ok(None),
        }
    }

    pub async fn _update_email(
        &self,
        user_id: UserId,
        email: String,
    ) -> Result<Session, AuthServiceError> {
        let email = auth::normalize_email(&email)?;

        let user = AppUser::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or(AuthServiceError::UserNotFound)?;

        if user.email != email {
            let email_taken = AppUser::find()
                .filter(AppUserColumn::Email.eq(email.as_str()))
                .one(&self.db)
                .await?
                .is_some();
            if email_taken {
                return Err(AuthServiceError::EmailTaken);
            }

            let mut user: AppUserActiveModel = user.into();
            user.email = Set(email);
            user.update(&self.db).await?;
            info!(%user_id, "email changed");
        }

        self.session_for(user_id).await
    }

    pub async fn _change_password(
        &self,
        user_id: UserId,
        old_password: String,
        new_password: String,
    ) -> Result<(), AuthServiceError> {
        auth::validate_password(&new_password)?;

        let user = AppUser::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or(AuthServiceError::UserNotFound)?;

        if !password::verify_password(&old_password, &user.password_hash)? {
            warn!(%user_id, "password change with wrong password");
            return Err(AuthServiceError::InvalidCredentials);
        }

        let mut user: AppUserActiveModel = user.into();
        user.password_hash = Set(password::hash_password(&new_password)?);
        user.update(&self.db).await?;

        info!(%user_id, "password changed");
        Ok(())
    }

    async fn session_for(&self, user_id: UserId) -> Result<Session, AuthServiceError> {
        let user = AppUser::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or(AuthServiceError::UserNotFound)?;

        let username = Profile::find_by_id(user_id)
            .one(&self.db)
            .await?
            .map(|profile| profile.username)
            .unwrap_or_default();

        Ok(Session {
            user_id,
            email: user.email,
            username,
            is_admin: self.roles.is_admin(user_id).await?,
        })
    }

    async fn caller(&self, ctx: &RequestContext) -> Result<UserId, AuthServiceError> {
        super::session_user(&self.db, &ctx.connection().remote_id())
            .await?
            .ok_or(AuthServiceError::Unauthenticated)
    }
}

/// One session per node; a new sign-in replaces the old binding.
async fn bind_node<C: ConnectionTrait>(
    db: &C,
    node_id: &PublicKey,
    user_id: UserId,
) -> Result<(), DbErr> {
    let identity = IdentityActiveModel {
        node_id: Set(node_id.as_bytes().to_vec()),
        user_id: Set(user_id),
        signed_in_at: Set(crate::time::now()),
    };

    Identity::insert(identity)
        .on_conflict(
            OnConflict::column(IdentityColumn::NodeId)
                .update_columns([IdentityColumn::UserId, IdentityColumn::SignedInAt])
                .to_owned(),
        )
        .exec(db)
        .await?;

    Ok(())
}

#[zel_service(name = "auth")]
trait Auth {
    #[doc = "Create an account and sign the calling node in"]
    #[method(name = "sign_up")]
    async fn sign_up(
        &self,
        email: String,
        password: String,
        username: String,
    ) -> Result<Session, ResourceError>;

    #[method(name = "sign_in")]
    async fn sign_in(&self, email: String, password: String) -> Result<Session, ResourceError>;

    #[method(name = "sign_out")]
    async fn sign_out(&self) -> Result<(), ResourceError>;

    #[doc = "Session bound to the calling node, if any"]
    #[method(name = "current_session")]
    async fn current_session(&self) -> Result<Option<Session>, ResourceError>;

    #[method(name = "update_email")]
    async fn update_email(&self, email: String) -> Result<Session, ResourceError>;

    #[method(name = "change_password")]
    async fn change_password(
        &self,
        old_password: String,
        new_password: String,
    ) -> Result<(), ResourceError>;
}

#[async_trait]
impl AuthServer for AuthService {
    async fn sign_up(
        &self,
        ctx: RequestContext,
        email: String,
        password: String,
        username: String,
    ) -> Result<Session, ResourceError> {
        let node_id = ctx.connection().remote_id();
        Ok(self._sign_up(node_id, email, password, username).await?)
    }

    async fn sign_in(
        &self,
        ctx: RequestContext,
        email: String,
        password: String,
    ) -> Result<Session, ResourceError> {
        let node_id = ctx.connection().remote_id();
        Ok(self._sign_in(node_id, email, password).await?)
    }

    async fn sign_out(&self, ctx: RequestContext) -> Result<(), ResourceError> {
        let node_id = ctx.connection().remote_id();
        Ok(self._sign_out(node_id).await?)
    }

    async fn current_session(&self, ctx: RequestContext) -> Result<Option<Session>, ResourceError> {
        let node_id = ctx.connection().remote_id();
        Ok(self._current_session(node_id).await?)
    }

    async fn update_email(&self, ctx: RequestContext, email: String) -> Result<Session, ResourceError> {
        let user_id = self.caller(&ctx).await?;
        Ok(self._update_email(user_id, email).await?)
    }

    async fn change_password(
        &self,
        ctx: RequestContext,
        old_password: String,
        new_password: String,
    ) -> Result<(), ResourceError> {
        let user_id = self.caller(&ctx).await?;
        Ok(self._change_password(user_id, old_password, new_password).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_db;
    use crate::service::testing::node;

    async fn setup_test_service() -> AuthService {
        let db = test_db().await;
        AuthService::new(db.clone(), RoleGate::new(db))
    }

    async fn sign_up_ana(service: &AuthService, node_id: PublicKey) -> Session {
        service
            ._sign_up(
                node_id,
                "Ana@Example.com".to_string(),
                "secret1".to_string(),
                "ana".to_string(),
            )
            .await
            .expect("sign up should succeed")
    }

    #[tokio::test]
    async fn test_sign_up_creates_profile_and_session() {
        let service = setup_test_service().await;
        let node_id = node();

        let session = sign_up_ana(&service, node_id).await;
        assert_eq!(session.email, "ana@example.com");
        assert_eq!(session.username, "ana");
        assert!(!session.is_admin);

        let current = service._current_session(node_id).await.unwrap();
        assert_eq!(current, Some(session));
    }

    #[tokio::test]
    async fn test_sign_up_rejects_duplicates() {
        let service = setup_test_service().await;
        sign_up_ana(&service, node()).await;

        let same_email = service
            ._sign_up(
                node(),
                "ana@example.com".to_string(),
                "secret1".to_string(),
                "other".to_string(),
            )
            .await;
        assert!(matches!(same_email, Err(AuthServiceError::EmailTaken)));

        let same_name = service
            ._sign_up(
                node(),
                "other@example.com".to_string(),
                "secret1".to_string(),
                "ana".to_string(),
            )
            .await;
        assert!(matches!(same_name, Err(AuthServiceError::UsernameTaken)));
    }

    #[tokio::test]
    async fn test_sign_up_validates_input() {
        let service = setup_test_service().await;

        let short = service
            ._sign_up(
                node(),
                "a@example.com".to_string(),
                "12345".to_string(),
                "ana".to_string(),
            )
            .await;
        assert!(matches!(
            short,
            Err(AuthServiceError::Credential(CredentialError::PasswordTooShort))
        ));

        let bad_name = service
            ._sign_up(
                node(),
                "a@example.com".to_string(),
                "123456".to_string(),
                "a!".to_string(),
            )
            .await;
        assert!(matches!(bad_name, Err(AuthServiceError::Credential(_))));
    }

    #[tokio::test]
    async fn test_sign_in_and_out() {
        let service = setup_test_service().await;
        let first = node();
        let session = sign_up_ana(&service, first).await;

        let second = node();
        let wrong = service
            ._sign_in(second, "ana@example.com".to_string(), "nope!!".to_string())
            .await;
        assert!(matches!(wrong, Err(AuthServiceError::InvalidCredentials)));
        assert_eq!(service._current_session(second).await.unwrap(), None);

        let signed_in = service
            ._sign_in(second, " ANA@example.com".to_string(), "secret1".to_string())
            .await
            .unwrap();
        assert_eq!(signed_in.user_id, session.user_id);

        service._sign_out(first).await.unwrap();
        assert_eq!(service._current_session(first).await.unwrap(), None);
        assert!(service._current_session(second).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_sign_in_replaces_node_binding() {
        let service = setup_test_service().await;
        let node_id = node();
        sign_up_ana(&service, node_id).await;
        let bob = service
            ._sign_up(
                node(),
                "bob@example.com".to_string(),
                "secret2".to_string(),
                "bob".to_string(),
            )
            .await
            .unwrap();

        service
            ._sign_in(node_id, "bob@example.com".to_string(), "secret2".to_string())
            .await
            .unwrap();

        let current = service._current_session(node_id).await.unwrap().unwrap();
        assert_eq!(current.user_id, bob.user_id);
    }

    #[tokio::test]
    async fn test_change_password() {
        let service = setup_test_service().await;
        let session = sign_up_ana(&service, node()).await;

        let wrong = service
            ._change_password(session.user_id, "bad".to_string(), "newsecret".to_string())
            .await;
        assert!(matches!(wrong, Err(AuthServiceError::InvalidCredentials)));

        service
            ._change_password(session.user_id, "secret1".to_string(), "newsecret".to_string())
            .await
            .unwrap();

        let result = service
            ._sign_in(node(), "ana@example.com".to_string(), "newsecret".to_string())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_update_email() {
        let service = setup_test_service().await;
        let session = sign_up_ana(&service, node()).await;
        service
            ._sign_up(
                node(),
                "bob@example.com".to_string(),
                "secret2".to_string(),
                "bob".to_string(),
            )
            .await
            .unwrap();

        let taken = service
            ._update_email(session.user_id, "bob@example.com".to_string())
            .await;
        assert!(matches!(taken, Err(AuthServiceError::EmailTaken)));

        let updated = service
            ._update_email(session.user_id, "ana@new.org".to_string())
            .await
            .unwrap();
        assert_eq!(updated.email, "ana@new.org");
    }
}
