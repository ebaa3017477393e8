use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use thiserror::Error;
use tracing::{info, warn};
use zel_core::prelude::*;

use crate::{
    entity::prelude::*,
    ids::{RoleId, UserId},
};

/// The one admin check every service goes through.
///
/// A user is an admin when a `(user, admin)` row exists in `user_role`.
#[derive(Clone)]
pub struct RoleGate {
    db: DatabaseConnection,
}

impl RoleGate {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn is_admin(&self, user_id: UserId) -> Result<bool, DbErr> {
        is_admin_on(&self.db, user_id).await
    }

    /// Fails with `denied` unless `user_id` is an admin.
    pub async fn require_admin<E>(&self, user_id: UserId, denied: E) -> Result<(), E>
    where
        E: From<DbErr>,
    {
        if self.is_admin(user_id).await? {
            Ok(())
        } else {
            warn!(%user_id, "admin check failed");
            Err(denied)
        }
    }
}

async fn is_admin_on<C: ConnectionTrait>(db: &C, user_id: UserId) -> Result<bool, DbErr> {
    let role = UserRole::find()
        .filter(UserRoleColumn::UserId.eq(user_id))
        .filter(UserRoleColumn::Role.eq(AppRole::Admin))
        .one(db)
        .await?;

    Ok(role.is_some())
}

async fn admin_count<C: ConnectionTrait>(db: &C) -> Result<u64, DbErr> {
    UserRole::find()
        .filter(UserRoleColumn::Role.eq(AppRole::Admin))
        .count(db)
        .await
}

#[derive(Debug, Error)]
pub enum RolesServiceError {
    #[error("fatal database error")]
    DbError(#[from] DbErr),

    #[error("user not found")]
    UserNotFound,

    #[error("unauthorized: admin role required")]
    Unauthorized,

    #[error("not signed in")]
    Unauthenticated,

    #[error("an admin already exists")]
    AdminExists,

    #[error("cannot revoke the last admin")]
    LastAdmin,
}

impl From<RolesServiceError> for ResourceError {
    fn from(error: RolesServiceError) -> Self {
        match error {
            RolesServiceError::DbError(error) => ResourceError::infra(error),
            RolesServiceError::UserNotFound => ResourceError::app(error),
            RolesServiceError::Unauthorized => ResourceError::app(error),
            RolesServiceError::Unauthenticated => ResourceError::app(error),
            RolesServiceError::AdminExists => ResourceError::app(error),
            RolesServiceError::LastAdmin => ResourceError::app(error),
        }
    }
}

#[derive(Clone)]
pub struct RolesService {
    db: DatabaseConnection,
    roles: RoleGate,
}

impl RolesService {
    pub fn new(db: DatabaseConnection, roles: RoleGate) -> Self {
        Self { db, roles }
    }

    pub async fn _is_admin(&self, user_id: UserId) -> Result<bool, RolesServiceError> {
        Ok(self.roles.is_admin(user_id).await?)
    }

    /// Grant the admin role. Granting it twice returns the existing row.
    pub async fn _grant_admin(
        &self,
        granter: UserId,
        target: UserId,
    ) -> Result<UserRoleModel, RolesServiceError> {
        self.roles
            .require_admin(granter, RolesServiceError::Unauthorized)
            .await?;

        let user_exists = AppUser::find_by_id(target).one(&self.db).await?.is_some();
        if !user_exists {
            return Err(RolesServiceError::UserNotFound);
        }

        let existing = UserRole::find()
            .filter(UserRoleColumn::UserId.eq(target))
            .filter(UserRoleColumn::Role.eq(AppRole::Admin))
            .one(&self.db)
            .await?;
        if let Some(role) = existing {
            return Ok(role);
        }

        let role = UserRoleActiveModel {
            id: Set(RoleId::new()),
            user_id: Set(target),
            role: Set(AppRole::Admin),
        };
        let role = UserRole::insert(role).exec_with_returning(&self.db).await?;

        info!(%granter, %target, "granted admin");
        Ok(role)
    }

    /// Revoke the admin role. Revoking from a non-admin is a no-op.
    pub async fn _revoke_admin(
        &self,
        granter: UserId,
        target: UserId,
    ) -> Result<(), RolesServiceError> {
        self.roles
            .require_admin(granter, RolesServiceError::Unauthorized)
            .await?;

        let txn = self.db.begin().await?;

        if !is_admin_on(&txn, target).await? {
            return Ok(());
        }
        if admin_count(&txn).await? <= 1 {
            return Err(RolesServiceError::LastAdmin);
        }

        UserRole::delete_many()
            .filter(UserRoleColumn::UserId.eq(target))
            .filter(UserRoleColumn::Role.eq(AppRole::Admin))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        info!(%granter, %target, "revoked admin");
        Ok(())
    }

    /// Make `user_id` the first admin. Only works while nobody is admin.
    pub async fn _claim_first_admin(
        &self,
        user_id: UserId,
    ) -> Result<UserRoleModel, RolesServiceError> {
        let txn = self.db.begin().await?;

        let user_exists = AppUser::find_by_id(user_id).one(&txn).await?.is_some();
        if !user_exists {
            return Err(RolesServiceError::UserNotFound);
        }
        if admin_count(&txn).await? > 0 {
            return Err(RolesServiceError::AdminExists);
        }

        let role = UserRoleActiveModel {
            id: Set(RoleId::new()),
            user_id: Set(user_id),
            role: Set(AppRole::Admin),
        };
        let role = UserRole::insert(role).exec_with_returning(&txn).await?;

        txn.commit().await?;
        info!(%user_id, "claimed first admin");
        Ok(role)
    }

    pub async fn _list_admins(&self) -> Result<Vec<UserRoleModel>, RolesServiceError> {
        let admins = UserRole::find()
            .filter(UserRoleColumn::Role.eq(AppRole::Admin))
            .order_by_asc(UserRoleColumn::Id)
            .all(&self.db)
            .await?;

        Ok(admins)
    }

    async fn caller(&self, ctx: &RequestContext) -> Result<UserId, RolesServiceError> {
        super::session_user(&self.db, &ctx.connection().remote_id())
            .await?
            .ok_or(RolesServiceError::Unauthenticated)
    }
}

#[zel_service(name = "roles")]
trait Roles {
    #[doc = "Check whether a user holds the admin role"]
    #[method(name = "is_admin")]
    async fn is_admin(&self, user_id: UserId) -> Result<bool, ResourceError>;

    #[doc = "Grant the admin role (admins only)"]
    #[method(name = "grant_admin")]
    async fn grant_admin(&self, user_id: UserId) -> Result<UserRoleModel, ResourceError>;

    #[doc = "Revoke the admin role (admins only, never the last one)"]
    #[method(name = "revoke_admin")]
    async fn revoke_admin(&self, user_id: UserId) -> Result<(), ResourceError>;

    #[doc = "Become the first admin of a fresh install"]
    #[method(name = "claim_first_admin")]
    async fn claim_first_admin(&self) -> Result<UserRoleModel, ResourceError>;

    #[method(name = "list_admins")]
    async fn list_admins(&self) -> Result<Vec<UserRoleModel>, ResourceError>;
}

#[async_trait]
impl RolesServer for RolesService {
    async fn is_admin(
        &self,
        _ctx: RequestContext,
        user_id: UserId,
    ) -> Result<bool, ResourceError> {
        Ok(self._is_admin(user_id).await?)
    }

    async fn grant_admin(
        &self,
        ctx: RequestContext,
        user_id: UserId,
    ) -> Result<UserRoleModel, ResourceError> {
        let granter = self.caller(&ctx).await?;
        Ok(self._grant_admin(granter, user_id).await?)
    }

    async fn revoke_admin(&self, ctx: RequestContext, user_id: UserId) -> Result<(), ResourceError> {
        let granter = self.caller(&ctx).await?;
        Ok(self._revoke_admin(granter, user_id).await?)
    }

    async fn claim_first_admin(&self, ctx: RequestContext) -> Result<UserRoleModel, ResourceError> {
        let user_id = self.caller(&ctx).await?;
        Ok(self._claim_first_admin(user_id).await?)
    }

    async fn list_admins(&self, _ctx: RequestContext) -> Result<Vec<UserRoleModel>, ResourceError> {
        Ok(self._list_admins().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_db;
    use crate::service::testing::{create_admin, create_user};

    async fn setup_test_service() -> RolesService {
        let db = test_db().await;
        RolesService::new(db.clone(), RoleGate::new(db))
    }

    #[tokio::test]
    async fn test_is_admin_reflects_role_rows() {
        let service = setup_test_service().await;
        let admin = create_admin(&service.db, "admin").await;
        let user = create_user(&service.db, "user").await;

        assert!(service._is_admin(admin).await.unwrap());
        assert!(!service._is_admin(user).await.unwrap());
    }

    #[tokio::test]
    async fn test_first_admin_can_only_be_claimed_once() {
        let service = setup_test_service().await;
        let first = create_user(&service.db, "first").await;
        let second = create_user(&service.db, "second").await;

        service._claim_first_admin(first).await.unwrap();
        assert!(service._is_admin(first).await.unwrap());

        let result = service._claim_first_admin(second).await;
        assert!(matches!(result, Err(RolesServiceError::AdminExists)));
    }

    #[tokio::test]
    async fn test_grant_requires_admin_and_is_idempotent() {
        let service = setup_test_service().await;
        let admin = create_admin(&service.db, "admin").await;
        let user = create_user(&service.db, "user").await;
        let other = create_user(&service.db, "other").await;

        let denied = service._grant_admin(user, other).await;
        assert!(matches!(denied, Err(RolesServiceError::Unauthorized)));

        let first = service._grant_admin(admin, user).await.unwrap();
        let second = service._grant_admin(admin, user).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(service._list_admins().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_grant_to_unknown_user_fails() {
        let service = setup_test_service().await;
        let admin = create_admin(&service.db, "admin").await;

        let result = service._grant_admin(admin, UserId::new()).await;
        assert!(matches!(result, Err(RolesServiceError::UserNotFound)));
    }

    #[tokio::test]
    async fn test_last_admin_cannot_be_revoked() {
        let service = setup_test_service().await;
        let admin = create_admin(&service.db, "admin").await;
        let user = create_user(&service.db, "user").await;

        let result = service._revoke_admin(admin, admin).await;
        assert!(matches!(result, Err(RolesServiceError::LastAdmin)));

        service._grant_admin(admin, user).await.unwrap();
        service._revoke_admin(user, admin).await.unwrap();
        assert!(!service._is_admin(admin).await.unwrap());
        assert!(service._is_admin(user).await.unwrap());
    }

    #[tokio::test]
    async fn test_require_admin_maps_denial() {
        let service = setup_test_service().await;
        let user = create_user(&service.db, "user").await;

        let result = service
            .roles
            .require_admin(user, RolesServiceError::Unauthorized)
            .await;
        assert!(matches!(result, Err(RolesServiceError::Unauthorized)));
    }
}
