use std::collections::HashMap;

use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use zel_core::prelude::*;

use super::roles::RoleGate;
use crate::{
    entity::prelude::*,
    ids::{MemberId, ProjectId, UserId},
};

pub const DEFAULT_MEMBER_ROLE: &str = "member";

#[derive(Debug, Error)]
pub enum MembersServiceError {
    #[error("fatal database error")]
    DbError(#[from] DbErr),

    #[error("project not found")]
    ProjectNotFound,

    #[error("user not found")]
    UserNotFound,

    #[error("user is not a member of this project")]
    MemberNotFound,

    #[error("unauthorized: admin role required")]
    Unauthorized,

    #[error("not signed in")]
    Unauthenticated,
}

impl From<MembersServiceError> for ResourceError {
    fn from(error: MembersServiceError) -> Self {
        match error {
            MembersServiceError::DbError(error) => ResourceError::infra(error),
            MembersServiceError::ProjectNotFound => ResourceError::app(error),
            MembersServiceError::UserNotFound => ResourceError::app(error),
            MembersServiceError::MemberNotFound => ResourceError::app(error),
            MembersServiceError::Unauthorized => ResourceError::app(error),
            MembersServiceError::Unauthenticated => ResourceError::app(error),
        }
    }
}

/// A membership row with the member's display name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberEntry {
    pub member: ProjectMemberModel,
    pub username: Option<String>,
}

#[derive(Clone)]
pub struct MembersService {
    db: DatabaseConnection,
    roles: RoleGate,
}

impl MembersService {
    pub fn new(db: DatabaseConnection, roles: RoleGate) -> Self {
        Self { db, roles }
    }

    /// Enrol a user in a project. Enrolling twice returns the existing row.
    pub async fn _add_member(
        &self,
        admin_id: UserId,
        project_id: ProjectId,
        user_id: UserId,
    ) -> Result<ProjectMemberModel, MembersServiceError> {
        self.roles
            .require_admin(admin_id, MembersServiceError::Unauthorized)
            .await?;

        let project_exists = Project::find_by_id(project_id)
            .one(&self.db)
            .await?
            .is_some();
        if !project_exists {
            return Err(MembersServiceError::ProjectNotFound);
        }

        let user_exists = AppUser::find_by_id(user_id).one(&self.db).await?.is_some();
        if !user_exists {
            return Err(MembersServiceError::UserNotFound);
        }

        if let Some(existing) = self.membership(project_id, user_id).await? {
            return Ok(existing);
        }

        let member = ProjectMemberActiveModel {
            id: Set(MemberId::new()),
            project_id: Set(project_id),
            user_id: Set(user_id),
            role: Set(DEFAULT_MEMBER_ROLE.to_string()),
            created_at: Set(crate::time::now()),
        };

        let member = ProjectMember::insert(member)
            .exec_with_returning(&self.db)
            .await?;

        info!(%project_id, %user_id, "member added");
        Ok(member)
    }

    pub async fn _remove_member(
        &self,
        admin_id: UserId,
        project_id: ProjectId,
        user_id: UserId,
    ) -> Result<(), MembersServiceError> {
        self.roles
            .require_admin(admin_id, MembersServiceError::Unauthorized)
            .await?;

        let result = ProjectMember::delete_many()
            .filter(ProjectMemberColumn::ProjectId.eq(project_id))
            .filter(ProjectMemberColumn::UserId.eq(user_id))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(MembersServiceError::MemberNotFound);
        }

        info!(%project_id, %user_id, "member removed");
        Ok(())
    }

    /// Members of a project in enrolment order
    pub async fn _list_members(
        &self,
        project_id: ProjectId,
    ) -> Result<Vec<MemberEntry>, MembersServiceError> {
        let members = ProjectMember::find()
            .filter(ProjectMemberColumn::ProjectId.eq(project_id))
            .order_by_asc(ProjectMemberColumn::CreatedAt)
            .order_by_asc(ProjectMemberColumn::Id)
            .all(&self.db)
            .await?;

        let user_ids: Vec<UserId> = members.iter().map(|m| m.user_id).collect();
        let usernames: HashMap<UserId, String> = Profile::find()
            .filter(ProfileColumn::Id.is_in(user_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|p| (p.id, p.username))
            .collect();

        Ok(members
            .into_iter()
            .map(|member| MemberEntry {
                username: usernames.get(&member.user_id).cloned(),
                member,
            })
            .collect())
    }

    pub async fn _is_member(
        &self,
        project_id: ProjectId,
        user_id: UserId,
    ) -> Result<bool, MembersServiceError> {
        Ok(self.membership(project_id, user_id).await?.is_some())
    }

    /// Projects the user is enrolled in, newest first
    pub async fn _list_enrolled_projects(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ProjectModel>, MembersServiceError> {
        let project_ids: Vec<ProjectId> = ProjectMember::find()
            .filter(ProjectMemberColumn::UserId.eq(user_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|m| m.project_id)
            .collect();

        if project_ids.is_empty() {
            return Ok(Vec::new());
        }

        let projects = Project::find()
            .filter(ProjectColumn::Id.is_in(project_ids))
            .order_by_desc(ProjectColumn::CreatedAt)
            .order_by_desc(ProjectColumn::Id)
            .all(&self.db)
            .await?;

        debug!(%user_id, count = projects.len(), "listed enrolled projects");
        Ok(projects)
    }

    async fn membership(
        &self,
        project_id: ProjectId,
        user_id: UserId,
    ) -> Result<Option<ProjectMemberModel>, DbErr> {
        ProjectMember::find()
            .filter(ProjectMemberColumn::ProjectId.eq(project_id))
            .filter(ProjectMemberColumn::UserId.eq(user_id))
            .one(&self.db)
            .await
    }

    async fn caller(&self, ctx: &RequestContext) -> Result<UserId, MembersServiceError> {
        super::session_user(&self.db, &ctx.connection().remote_id())
            .await?
            .ok_or(MembersServiceError::Unauthenticated)
    }
}

#[zel_service(name = "members")]
trait Members {
    #[doc = "Enrol a user in a project (admins only)"]
    #[method(name = "add_member")]
    async fn add_member(
        &self,
        project_id: ProjectId,
        user_id: UserId,
    ) -> Result<ProjectMemberModel, ResourceError>;

    #[doc = "Remove a user from a project (admins only)"]
    #[method(name = "remove_member")]
    async fn remove_member(&self, project_id: ProjectId, user_id: UserId)
        -> Result<(), ResourceError>;

    #[method(name = "list_members")]
    async fn list_members(&self, project_id: ProjectId) -> Result<Vec<MemberEntry>, ResourceError>;

    #[doc = "Projects the signed-in user is enrolled in"]
    #[method(name = "my_projects")]
    async fn my_projects(&self) -> Result<Vec<ProjectModel>, ResourceError>;
}

#[async_trait]
impl MembersServer for MembersService {
    async fn add_member(
        &self,
        ctx: RequestContext,
        project_id: ProjectId,
        user_id: UserId,
    ) -> Result<ProjectMemberModel, ResourceError> {
        let admin_id = self.caller(&ctx).await?;
        Ok(self._add_member(admin_id, project_id, user_id).await?)
    }

    async fn remove_member(
        &self,
        ctx: RequestContext,
        project_id: ProjectId,
        user_id: UserId,
    ) -> Result<(), ResourceError> {
        let admin_id = self.caller(&ctx).await?;
        Ok(self._remove_member(admin_id, project_id, user_id).await?)
    }

    async fn list_members(
        &self,
        _ctx: RequestContext,
        project_id: ProjectId,
    ) -> Result<Vec<MemberEntry>, ResourceError> {
        Ok(self._list_members(project_id).await?)
    }

    async fn my_projects(&self, ctx: RequestContext) -> Result<Vec<ProjectModel>, ResourceError> {
        let user_id = self.caller(&ctx).await?;
        Ok(self._list_enrolled_projects(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_db;
    use crate::service::projects::{tests::project, ProjectsService};
    use crate::service::testing::{create_admin, create_user};

    struct Fixture {
        members: MembersService,
        projects: ProjectsService,
        admin: UserId,
    }

    async fn setup() -> Fixture {
        let db = test_db().await;
        let admin = create_admin(&db, "admin").await;
        let roles = RoleGate::new(db.clone());
        Fixture {
            members: MembersService::new(db.clone(), roles.clone()),
            projects: ProjectsService::new(db, roles),
            admin,
        }
    }

    #[tokio::test]
    async fn test_add_member_is_idempotent() {
        let f = setup().await;
        let user = create_user(&f.members.db, "ana").await;
        let p = f.projects._create_project(f.admin, project("p")).await.unwrap();

        let first = f.members._add_member(f.admin, p.id, user).await.unwrap();
        let second = f.members._add_member(f.admin, p.id, user).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.role, DEFAULT_MEMBER_ROLE);

        let members = f.members._list_members(p.id).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].username.as_deref(), Some("ana"));
    }

    #[tokio::test]
    async fn test_add_member_checks_targets_and_role() {
        let f = setup().await;
        let user = create_user(&f.members.db, "ana").await;
        let p = f.projects._create_project(f.admin, project("p")).await.unwrap();

        let denied = f.members._add_member(user, p.id, user).await;
        assert!(matches!(denied, Err(MembersServiceError::Unauthorized)));

        let no_project = f.members._add_member(f.admin, ProjectId::new(), user).await;
        assert!(matches!(no_project, Err(MembersServiceError::ProjectNotFound)));

        let no_user = f.members._add_member(f.admin, p.id, UserId::new()).await;
        assert!(matches!(no_user, Err(MembersServiceError::UserNotFound)));
    }

    #[tokio::test]
    async fn test_non_member_sees_no_projects() {
        let f = setup().await;
        let ana = create_user(&f.members.db, "ana").await;
        let bob = create_user(&f.members.db, "bob").await;
        let p1 = f.projects._create_project(f.admin, project("p1")).await.unwrap();
        f.projects._create_project(f.admin, project("p2")).await.unwrap();

        f.members._add_member(f.admin, p1.id, ana).await.unwrap();

        let ana_projects = f.members._list_enrolled_projects(ana).await.unwrap();
        assert_eq!(ana_projects.len(), 1);
        assert_eq!(ana_projects[0].id, p1.id);

        assert!(f.members._list_enrolled_projects(bob).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_member() {
        let f = setup().await;
        let ana = create_user(&f.members.db, "ana").await;
        let p = f.projects._create_project(f.admin, project("p")).await.unwrap();
        f.members._add_member(f.admin, p.id, ana).await.unwrap();

        f.members._remove_member(f.admin, p.id, ana).await.unwrap();
        assert!(!f.members._is_member(p.id, ana).await.unwrap());

        let again = f.members._remove_member(f.admin, p.id, ana).await;
        assert!(matches!(again, Err(MembersServiceError::MemberNotFound)));
    }
}
