use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use zel_core::prelude::*;

use super::{non_blank, roles::RoleGate};
use crate::{
    entity::prelude::*,
    ids::{ContentId, ProjectId, UserId},
};

#[derive(Debug, Error)]
pub enum ProjectsServiceError {
    #[error("fatal database error")]
    DbError(#[from] DbErr),

    #[error("project not found")]
    ProjectNotFound,

    #[error("content not found")]
    ContentNotFound,

    #[error("unauthorized: admin role required")]
    Unauthorized,

    #[error("not signed in")]
    Unauthenticated,

    #[error("invalid input: {0}")]
    Validation(&'static str),
}

impl From<ProjectsServiceError> for ResourceError {
    fn from(error: ProjectsServiceError) -> Self {
        match error {
            ProjectsServiceError::DbError(error) => ResourceError::infra(error),
            ProjectsServiceError::ProjectNotFound => ResourceError::app(error),
            ProjectsServiceError::ContentNotFound => ResourceError::app(error),
            ProjectsServiceError::Unauthorized => ResourceError::app(error),
            ProjectsServiceError::Unauthenticated => ResourceError::app(error),
            ProjectsServiceError::Validation(_) => ResourceError::app(error),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NewProject {
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
}

/// Fields left as `None` keep their stored value.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProjectChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// A curriculum step as entered by an admin. Also used for event content.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewContent {
    pub title: String,
    pub description: Option<String>,
    pub content_type: ContentType,
    pub content_url: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ContentChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content_type: Option<ContentType>,
    pub content_url: Option<String>,
}

pub(crate) fn required_title(title: &str) -> Result<String, &'static str> {
    let title = title.trim();
    if title.is_empty() {
        return Err("title is required");
    }
    Ok(title.to_string())
}

#[derive(Clone)]
pub struct ProjectsService {
    db: DatabaseConnection,
    roles: RoleGate,
}

impl ProjectsService {
    pub fn new(db: DatabaseConnection, roles: RoleGate) -> Self {
        Self { db, roles }
    }

    /// All projects, newest first
    pub async fn _list_projects(&self) -> Result<Vec<ProjectModel>, ProjectsServiceError> {
        let projects = Project::find()
            .order_by_desc(ProjectColumn::CreatedAt)
            .order_by_desc(ProjectColumn::Id)
            .all(&self.db)
            .await?;

        Ok(projects)
    }

    pub async fn _get_project(
        &self,
        project_id: ProjectId,
    ) -> Result<ProjectModel, ProjectsServiceError> {
        Project::find_by_id(project_id)
            .one(&self.db)
            .await?
            .ok_or(ProjectsServiceError::ProjectNotFound)
    }

    pub async fn _create_project(
        &self,
        admin_id: UserId,
        project: NewProject,
    ) -> Result<ProjectModel, ProjectsServiceError> {
        self.roles
            .require_admin(admin_id, ProjectsServiceError::Unauthorized)
            .await?;

        let title = required_title(&project.title).map_err(ProjectsServiceError::Validation)?;

        let project = ProjectActiveModel {
            id: Set(ProjectId::new()),
            title: Set(title),
            description: Set(non_blank(project.description)),
            image_url: Set(non_blank(project.image_url)),
            tags: Set(Tags::normalized(project.tags)),
            author_id: Set(Some(admin_id)),
            created_at: Set(crate::time::now()),
        };

        let project = Project::insert(project)
            .exec_with_returning(&self.db)
            .await?;

        info!(project_id = %project.id, "project created");
        Ok(project)
    }

    pub async fn _update_project(
        &self,
        admin_id: UserId,
        project_id: ProjectId,
        changes: ProjectChanges,
    ) -> Result<ProjectModel, ProjectsServiceError> {
        self.roles
            .require_admin(admin_id, ProjectsServiceError::Unauthorized)
            .await?;

        let current = self._get_project(project_id).await?;
        let mut project: ProjectActiveModel = current.clone().into();

        if let Some(title) = changes.title {
            let title = required_title(&title).map_err(ProjectsServiceError::Validation)?;
            project.title = Set(title);
        }
        if let Some(description) = changes.description {
            project.description = Set(non_blank(Some(description)));
        }
        if let Some(image_url) = changes.image_url {
            project.image_url = Set(non_blank(Some(image_url)));
        }
        if let Some(tags) = changes.tags {
            project.tags = Set(Tags::normalized(tags));
        }

        if !project.is_changed() {
            return Ok(current);
        }

        let project = project.update(&self.db).await?;
        info!(%project_id, "project updated");
        Ok(project)
    }

    /// Delete a project; content, members and progress go with it
    pub async fn _delete_project(
        &self,
        admin_id: UserId,
        project_id: ProjectId,
    ) -> Result<(), ProjectsServiceError> {
        self.roles
            .require_admin(admin_id, ProjectsServiceError::Unauthorized)
            .await?;

        let result = Project::delete_by_id(project_id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(ProjectsServiceError::ProjectNotFound);
        }

        info!(%project_id, "project deleted");
        Ok(())
    }

    /// Append a step to the end of a project's curriculum
    pub async fn _add_content(
        &self,
        admin_id: UserId,
        project_id: ProjectId,
        content: NewContent,
    ) -> Result<ProjectContentModel, ProjectsServiceError> {
        self.roles
            .require_admin(admin_id, ProjectsServiceError::Unauthorized)
            .await?;

        self._get_project(project_id).await?;

        let title = required_title(&content.title).map_err(ProjectsServiceError::Validation)?;

        let content = ProjectContentActiveModel {
            id: Set(ContentId::new()),
            project_id: Set(project_id),
            title: Set(title),
            description: Set(non_blank(content.description)),
            content_type: Set(content.content_type),
            content_url: Set(non_blank(content.content_url)),
            author_id: Set(Some(admin_id)),
            created_at: Set(crate::time::now()),
        };

        let content = ProjectContent::insert(content)
            .exec_with_returning(&self.db)
            .await?;

        info!(%project_id, content_id = %content.id, "content added");
        Ok(content)
    }

    /// A project's steps in curriculum order
    pub async fn _list_contents(
        &self,
        project_id: ProjectId,
    ) -> Result<Vec<ProjectContentModel>, ProjectsServiceError> {
        self._get_project(project_id).await?;

        let contents = ProjectContent::find()
            .filter(ProjectContentColumn::ProjectId.eq(project_id))
            .order_by_asc(ProjectContentColumn::CreatedAt)
            .order_by_asc(ProjectContentColumn::Id)
            .all(&self.db)
            .await?;

        debug!(%project_id, count = contents.len(), "listed contents");
        Ok(contents)
    }

    pub async fn _get_content(
        &self,
        content_id: ContentId,
    ) -> Result<ProjectContentModel, ProjectsServiceError> {
        ProjectContent::find_by_id(content_id)
            .one(&self.db)
            .await?
            .ok_or(ProjectsServiceError::ContentNotFound)
    }

    pub async fn _update_content(
        &self,
        admin_id: UserId,
        content_id: ContentId,
        changes: ContentChanges,
    ) -> Result<ProjectContentModel, ProjectsServiceError> {
        self.roles
            .require_admin(admin_id, ProjectsServiceError::Unauthorized)
            .await?;

        let current = self._get_content(content_id).await?;
        let mut content: ProjectContentActiveModel = current.clone().into();

        if let Some(title) = changes.title {
            let title = required_title(&title).map_err(ProjectsServiceError::Validation)?;
            content.title = Set(title);
        }
        if let Some(description) = changes.description {
            content.description = Set(non_blank(Some(description)));
        }
        if let Some(content_type) = changes.content_type {
            content.content_type = Set(content_type);
        }
        if let Some(content_url) = changes.content_url {
            content.content_url = Set(non_blank(Some(content_url)));
        }

        if !content.is_changed() {
            return Ok(current);
        }

        let content = content.update(&self.db).await?;
        info!(%content_id, "content updated");
        Ok(content)
    }

    pub async fn _delete_content(
        &self,
        admin_id: UserId,
        content_id: ContentId,
    ) -> Result<(), ProjectsServiceError> {
        self.roles
            .require_admin(admin_id, ProjectsServiceError::Unauthorized)
            .await?;

        let result = ProjectContent::delete_by_id(content_id)
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ProjectsServiceError::ContentNotFound);
        }

        info!(%content_id, "content deleted");
        Ok(())
    }

    async fn caller(&self, ctx: &RequestContext) -> Result<UserId, ProjectsServiceError> {
        super::session_user(&self.db, &ctx.connection().remote_id())
            .await?
            .ok_or(ProjectsServiceError::Unauthenticated)
    }
}

#[zel_service(name = "projects")]
trait Projects {
    #[doc = "List all projects, newest first"]
    #[method(name = "list_projects")]
    async fn list_projects(&self) -> Result<Vec<ProjectModel>, ResourceError>;

    #[method(name = "get_project")]
    async fn get_project(&self, project_id: ProjectId) -> Result<ProjectModel, ResourceError>;

    #[doc = "Create a project (admins only)"]
    #[method(name = "create_project")]
    async fn create_project(&self, project: NewProject) -> Result<ProjectModel, ResourceError>;

    #[doc = "Update a project (admins only)"]
    #[method(name = "update_project")]
    async fn update_project(
        &self,
        project_id: ProjectId,
        changes: ProjectChanges,
    ) -> Result<ProjectModel, ResourceError>;

    #[doc = "Delete a project (admins only)"]
    #[method(name = "delete_project")]
    async fn delete_project(&self, project_id: ProjectId) -> Result<(), ResourceError>;

    #[doc = "Add a curriculum step (admins only)"]
    #[method(name = "add_content")]
    async fn add_content(
        &self,
        project_id: ProjectId,
        content: NewContent,
    ) -> Result<ProjectContentModel, ResourceError>;

    #[doc = "List a project's steps in curriculum order"]
    #[method(name = "list_contents")]
    async fn list_contents(
        &self,
        project_id: ProjectId,
    ) -> Result<Vec<ProjectContentModel>, ResourceError>;

    #[method(name = "update_content")]
    async fn update_content(
        &self,
        content_id: ContentId,
        changes: ContentChanges,
    ) -> Result<ProjectContentModel, ResourceError>;

    #[method(name = "delete_content")]
    async fn delete_content(&self, content_id: ContentId) -> Result<(), ResourceError>;
}

#[async_trait]
impl ProjectsServer for ProjectsService {
    async fn list_projects(&self, _ctx: RequestContext) -> Result<Vec<ProjectModel>, ResourceError> {
        Ok(self._list_projects().await?)
    }

    async fn get_project(
        &self,
        _ctx: RequestContext,
        project_id: ProjectId,
    ) -> Result<ProjectModel, ResourceError> {
        Ok(self._get_project(project_id).await?)
    }

    async fn create_project(
        &self,
        ctx: RequestContext,
        project: NewProject,
    ) -> Result<ProjectModel, ResourceError> {
        let admin_id = self.caller(&ctx).await?;
        Ok(self._create_project(admin_id, project).await?)
    }

    async fn update_project(
        &self,
        ctx: RequestContext,
        project_id: ProjectId,
        changes: ProjectChanges,
    ) -> Result<ProjectModel, ResourceError> {
        let admin_id = self.caller(&ctx).await?;
        Ok(self._update_project(admin_id, project_id, changes).await?)
    }

    async fn delete_project(
        &self,
        ctx: RequestContext,
        project_id: ProjectId,
    ) -> Result<(), ResourceError> {
        let admin_id = self.caller(&ctx).await?;
        Ok(self._delete_project(admin_id, project_id).await?)
    }

    async fn add_content(
        &self,
        ctx: RequestContext,
        project_id: ProjectId,
        content: NewContent,
    ) -> Result<ProjectContentModel, ResourceError> {
        let admin_id = self.caller(&ctx).await?;
        Ok(self._add_content(admin_id, project_id, content).await?)
    }

    async fn list_contents(
        &self,
        _ctx: RequestContext,
        project_id: ProjectId,
    ) -> Result<Vec<ProjectContentModel>, ResourceError> {
        Ok(self._list_contents(project_id).await?)
    }

    async fn update_content(
        &self,
        ctx: RequestContext,
        content_id: ContentId,
        changes: ContentChanges,
    ) -> Result<ProjectContentModel, ResourceError> {
        let admin_id = self.caller(&ctx).await?;
        Ok(self._update_content(admin_id, content_id, changes).await?)
    }

    async fn delete_content(
        &self,
        ctx: RequestContext,
        content_id: ContentId,
    ) -> Result<(), ResourceError> {
        let admin_id = self.caller(&ctx).await?;
        Ok(self._delete_content(admin_id, content_id).await?)
    }
}
