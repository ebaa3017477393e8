use std::collections::HashMap;

use sea_orm::{sea_query::OnConflict, DatabaseConnection};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use zel_core::prelude::*;

use crate::{
    entity::prelude::*,
    ids::{ContentId, EventContentId, EventId, ProgressionId, ProjectId, UserId},
    progress::{self, StepStatus, COMPLETE},
};

#[derive(Debug, Error)]
pub enum ProgressServiceError {
    #[error("fatal database error")]
    DbError(#[from] DbErr),

    #[error("project not found")]
    ProjectNotFound,

    #[error("event not found")]
    EventNotFound,

    #[error("content not found in this curriculum")]
    ContentNotFound,

    #[error("user is not enrolled in this project")]
    NotMember,

    #[error("user is not registered for this event")]
    NotRegistered,

    #[error("progress must be between 0 and 100, got {0}")]
    OutOfRange(i32),

    #[error("not signed in")]
    Unauthenticated,
}

impl From<ProgressServiceError> for ResourceError {
    fn from(error: ProgressServiceError) -> Self {
        match error {
            ProgressServiceError::DbError(error) => ResourceError::infra(error),
            ProgressServiceError::ProjectNotFound => ResourceError::app(error),
            ProgressServiceError::EventNotFound => ResourceError::app(error),
            ProgressServiceError::ContentNotFound => ResourceError::app(error),
            ProgressServiceError::NotMember => ResourceError::app(error),
            ProgressServiceError::NotRegistered => ResourceError::app(error),
            ProgressServiceError::OutOfRange(_) => ResourceError::app(error),
            ProgressServiceError::Unauthenticated => ResourceError::app(error),
        }
    }
}

/// A user's standing in one project's curriculum.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectProgress {
    pub project_id: ProjectId,
    pub total: u64,
    pub completed: u64,
    pub percent: u8,
    pub steps: Vec<StepStatus<ContentId>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventProgress {
    pub event_id: EventId,
    pub total: u64,
    pub completed: u64,
    pub percent: u8,
    pub steps: Vec<StepStatus<EventContentId>>,
}

/// Per-project progress plus their rounded mean.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverallProgress {
    pub percent: u8,
    pub projects: Vec<ProjectProgress>,
}

fn steps_for<K: Copy + Eq + std::hash::Hash>(
    contents: impl IntoIterator<Item = (K, String)>,
    progress_by_step: &HashMap<K, i32>,
) -> Vec<StepStatus<K>> {
    contents
        .into_iter()
        .map(|(content_id, title)| {
            let progress_num = progress_by_step.get(&content_id).copied().unwrap_or(0);
            StepStatus {
                content_id,
                title,
                progress_num,
                done: progress_num >= COMPLETE,
            }
        })
        .collect()
}

fn check_range(progress_num: i32) -> Result<(), ProgressServiceError> {
    if (0..=COMPLETE).contains(&progress_num) {
        Ok(())
    } else {
        Err(ProgressServiceError::OutOfRange(progress_num))
    }
}

#[derive(Clone)]
pub struct ProgressService {
    db: DatabaseConnection,
}

impl ProgressService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Mark a step as done. Repeating it keeps a single row.
    pub async fn _mark_complete(
        &self,
        user_id: UserId,
        project_id: ProjectId,
        content_id: ContentId,
    ) -> Result<ProjectProgressionModel, ProgressServiceError> {
        self._set_progress(user_id, project_id, content_id, COMPLETE)
            .await
    }

    /// Record partial progress (0-100) on a step
    pub async fn _set_progress(
        &self,
        user_id: UserId,
        project_id: ProjectId,
        content_id: ContentId,
        progress_num: i32,
    ) -> Result<ProjectProgressionModel, ProgressServiceError> {
        check_range(progress_num)?;

        let project_exists = Project::find_by_id(project_id)
            .one(&self.db)
            .await?
            .is_some();
        if !project_exists {
            return Err(ProgressServiceError::ProjectNotFound);
        }

        let in_project = ProjectContent::find_by_id(content_id)
            .one(&self.db)
            .await?
            .is_some_and(|content| content.project_id == project_id);
        if !in_project {
            return Err(ProgressServiceError::ContentNotFound);
        }

        let is_member = ProjectMember::find()
            .filter(ProjectMemberColumn::ProjectId.eq(project_id))
            .filter(ProjectMemberColumn::UserId.eq(user_id))
            .one(&self.db)
            .await?
            .is_some();
        if !is_member {
            warn!(%user_id, %project_id, "progress write by non-member");
            return Err(ProgressServiceError::NotMember);
        }

        let row = ProjectProgressionActiveModel {
            id: Set(ProgressionId::new()),
            project_id: Set(project_id),
            user_id: Set(user_id),
            content_id: Set(content_id),
            progress_num: Set(progress_num),
            updated_at: Set(crate::time::now()),
        };

        ProjectProgression::insert(row)
            .on_conflict(
                OnConflict::columns([
                    ProjectProgressionColumn::ProjectId,
                    ProjectProgressionColumn::UserId,
                    ProjectProgressionColumn::ContentId,
                ])
                .update_columns([
                    ProjectProgressionColumn::ProgressNum,
                    ProjectProgressionColumn::UpdatedAt,
                ])
                .to_owned(),
            )
            .exec(&self.db)
            .await?;

        let row = ProjectProgression::find()
            .filter(ProjectProgressionColumn::ProjectId.eq(project_id))
            .filter(ProjectProgressionColumn::UserId.eq(user_id))
            .filter(ProjectProgressionColumn::ContentId.eq(content_id))
            .one(&self.db)
            .await?
            .ok_or(DbErr::RecordNotFound("project_progression".to_string()))?;

        info!(%user_id, %project_id, %content_id, progress_num, "progress saved");
        Ok(row)
    }

    /// Completion of one project for one user.
    ///
    /// A project without steps is 0 % complete. Rows pointing at steps that
    /// no longer belong to the project are ignored.
    pub async fn _project_progress(
        &self,
        user_id: UserId,
        project_id: ProjectId,
    ) -> Result<ProjectProgress, ProgressServiceError> {
        let project_exists = Project::find_by_id(project_id)
            .one(&self.db)
            .await?
            .is_some();
        if !project_exists {
            return Err(ProgressServiceError::ProjectNotFound);
        }

        let contents = ProjectContent::find()
            .filter(ProjectContentColumn::ProjectId.eq(project_id))
            .order_by_asc(ProjectContentColumn::CreatedAt)
            .order_by_asc(ProjectContentColumn::Id)
            .all(&self.db)
            .await?;

        let rows = ProjectProgression::find()
            .filter(ProjectProgressionColumn::ProjectId.eq(project_id))
            .filter(ProjectProgressionColumn::UserId.eq(user_id))
            .all(&self.db)
            .await?;

        let total = contents.len() as u64;
        let completed = progress::completed_steps(
            contents.iter().map(|c| c.id),
            rows.iter().map(|r| (r.content_id, r.progress_num)),
        );
        let by_step: HashMap<ContentId, i32> =
            rows.iter().map(|r| (r.content_id, r.progress_num)).collect();

        debug!(%user_id, %project_id, total, completed, "computed project progress");
        Ok(ProjectProgress {
            project_id,
            total,
            completed,
            percent: progress::completion_percent(completed, total),
            steps: steps_for(contents.into_iter().map(|c| (c.id, c.title)), &by_step),
        })
    }

    pub async fn _progress_for_projects(
        &self,
        user_id: UserId,
        project_ids: Vec<ProjectId>,
    ) -> Result<Vec<ProjectProgress>, ProgressServiceError> {
        let mut entries = Vec::with_capacity(project_ids.len());
        for project_id in project_ids {
            entries.push(self._project_progress(user_id, project_id).await?);
        }
        Ok(entries)
    }

    /// Progress over every project the user is enrolled in
    pub async fn _overall_progress(
        &self,
        user_id: UserId,
    ) -> Result<OverallProgress, ProgressServiceError> {
        let project_ids: Vec<ProjectId> = ProjectMember::find()
            .filter(ProjectMemberColumn::UserId.eq(user_id))
            .order_by_asc(ProjectMemberColumn::CreatedAt)
            .order_by_asc(ProjectMemberColumn::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|m| m.project_id)
            .collect();

        let projects = self._progress_for_projects(user_id, project_ids).await?;
        let percent = progress::overall_percent(projects.iter().map(|p| p.percent));

        Ok(OverallProgress { percent, projects })
    }

    /// Mark an event step as done; only registered attendees may
    pub async fn _mark_event_content_complete(
        &self,
        user_id: UserId,
        event_id: EventId,
        content_id: EventContentId,
    ) -> Result<EventProgressionModel, ProgressServiceError> {
        let event_exists = Event::find_by_id(event_id).one(&self.db).await?.is_some();
        if !event_exists {
            return Err(ProgressServiceError::EventNotFound);
        }

        let in_event = EventContent::find_by_id(content_id)
            .one(&self.db)
            .await?
            .is_some_and(|content| content.event_id == event_id);
        if !in_event {
            return Err(ProgressServiceError::ContentNotFound);
        }

        let registered = EventRegistration::find()
            .filter(EventRegistrationColumn::EventId.eq(event_id))
            .filter(EventRegistrationColumn::UserId.eq(user_id))
            .one(&self.db)
            .await?
            .is_some();
        if !registered {
            warn!(%user_id, %event_id, "progress write by non-attendee");
            return Err(ProgressServiceError::NotRegistered);
        }

        let row = EventProgressionActiveModel {
            id: Set(ProgressionId::new()),
            event_id: Set(event_id),
            user_id: Set(user_id),
            content_id: Set(content_id),
            progress_num: Set(COMPLETE),
            updated_at: Set(crate::time::now()),
        };

        EventProgression::insert(row)
            .on_conflict(
                OnConflict::columns([
                    EventProgressionColumn::EventId,
                    EventProgressionColumn::UserId,
                    EventProgressionColumn::ContentId,
                ])
                .update_columns([
                    EventProgressionColumn::ProgressNum,
                    EventProgressionColumn::UpdatedAt,
                ])
                .to_owned(),
            )
            .exec(&self.db)
            .await?;

        let row = EventProgression::find()
            .filter(EventProgressionColumn::EventId.eq(event_id))
            .filter(EventProgressionColumn::UserId.eq(user_id))
            .filter(EventProgressionColumn::ContentId.eq(content_id))
            .one(&self.db)
            .await?
            .ok_or(DbErr::RecordNotFound("event_progression".to_string()))?;

        info!(%user_id, %event_id, %content_id, "event step completed");
        Ok(row)
    }

    pub async fn _event_progress(
        &self,
        user_id: UserId,
        event_id: EventId,
    ) -> Result<EventProgress, ProgressServiceError> {
        let event_exists = Event::find_by_id(event_id).one(&self.db).await?.is_some();
        if !event_exists {
            return Err(ProgressServiceError::EventNotFound);
        }

        let contents = EventContent::find()
            .filter(EventContentColumn::EventId.eq(event_id))
            .order_by_asc(EventContentColumn::CreatedAt)
            .order_by_asc(EventContentColumn::Id)
            .all(&self.db)
            .await?;

        let rows = EventProgression::find()
            .filter(EventProgressionColumn::EventId.eq(event_id))
            .filter(EventProgressionColumn::UserId.eq(user_id))
            .all(&self.db)
            .await?;

        let total = contents.len() as u64;
        let completed = progress::completed_steps(
            contents.iter().map(|c| c.id),
            rows.iter().map(|r| (r.content_id, r.progress_num)),
        );
        let by_step: HashMap<EventContentId, i32> =
            rows.iter().map(|r| (r.content_id, r.progress_num)).collect();

        Ok(EventProgress {
            event_id,
            total,
            completed,
            percent: progress::completion_percent(completed, total),
            steps: steps_for(contents.into_iter().map(|c| (c.id, c.title)), &by_step),
        })
    }

    async fn caller(&self, ctx: &RequestContext) -> Result<UserId, ProgressServiceError> {
        super::session_user(&self.db, &ctx.connection().remote_id())
            .await?
            .ok_or(ProgressServiceError::Unauthenticated)
    }
}

#[zel_service(name = "progress")]
trait Progress {
    #[doc = "Mark a project step as complete for the signed-in user"]
    #[method(name = "mark_complete")]
    async fn mark_complete(
        &self,
        project_id: ProjectId,
        content_id: ContentId,
    ) -> Result<ProjectProgressionModel, ResourceError>;

    #[method(name = "set_progress")]
    async fn set_progress(
        &self,
        project_id: ProjectId,
        content_id: ContentId,
        progress_num: i32,
    ) -> Result<ProjectProgressionModel, ResourceError>;

    #[method(name = "project_progress")]
    async fn project_progress(&self, project_id: ProjectId)
        -> Result<ProjectProgress, ResourceError>;

    #[method(name = "progress_for_projects")]
    async fn progress_for_projects(
        &self,
        project_ids: Vec<ProjectId>,
    ) -> Result<Vec<ProjectProgress>, ResourceError>;

    #[doc = "Mean completion over the signed-in user's enrolled projects"]
    #[method(name = "overall_progress")]
    async fn overall_progress(&self) -> Result<OverallProgress, ResourceError>;

    #[method(name = "mark_event_content_complete")]
    async fn mark_event_content_complete(
        &self,
        event_id: EventId,
        content_id: EventContentId,
    ) -> Result<EventProgressionModel, ResourceError>;

    #[method(name = "event_progress")]
    async fn event_progress(&self, event_id: EventId) -> Result<EventProgress, ResourceError>;
}

#[async_trait]
impl ProgressServer for ProgressService {
    async fn mark_complete(
        &self,
        ctx: RequestContext,
        project_id: ProjectId,
        content_id: ContentId,
    ) -> Result<ProjectProgressionModel, ResourceError> {
        let user_id = self.caller(&ctx).await?;
        Ok(self._mark_complete(user_id, project_id, content_id).await?)
    }

    async fn set_progress(
        &self,
        ctx: RequestContext,
        project_id: ProjectId,
        content_id: ContentId,
        progress_num: i32,
    ) -> Result<ProjectProgressionModel, ResourceError> {
        let user_id = self.caller(&ctx).await?;
        Ok(self
            ._set_progress(user_id, project_id, content_id, progress_num)
            .await?)
    }

    async fn project_progress(
        &self,
        ctx: RequestContext,
        project_id: ProjectId,
    ) -> Result<ProjectProgress, ResourceError> {
        let user_id = self.caller(&ctx).await?;
        Ok(self._project_progress(user_id, project_id).await?)
    }

    async fn progress_for_projects(
        &self,
        ctx: RequestContext,
        project_ids: Vec<ProjectId>,
    ) -> Result<Vec<ProjectProgress>, ResourceError> {
        let user_id = self.caller(&ctx).await?;
        Ok(self._progress_for_projects(user_id, project_ids).await?)
    }

    async fn overall_progress(&self, ctx: RequestContext) -> Result<OverallProgress, ResourceError> {
        let user_id = self.caller(&ctx).await?;
        Ok(self._overall_progress(user_id).await?)
    }

    async fn mark_event_content_complete(
        &self,
        ctx: RequestContext,
        event_id: EventId,
        content_id: EventContentId,
    ) -> Result<EventProgressionModel, ResourceError> {
        let user_id = self.caller(&ctx).await?;
        Ok(self
            ._mark_event_content_complete(user_id, event_id, content_id)
            .await?)
    }

    async fn event_progress(
        &self,
        ctx: RequestContext,
        event_id: EventId,
    ) -> Result<EventProgress, ResourceError> {
        let user_id = self.caller(&ctx).await?;
        Ok(self._event_progress(user_id, event_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_db;
    use crate::service::{
        members::MembersService,
        projects::{
            tests::{project, step},
            ProjectsService,
        },
        roles::RoleGate,
        testing::{create_admin, create_user},
    };

    struct Fixture {
        progress: ProgressService,
        projects: ProjectsService,
        members: MembersService,
        admin: UserId,
        learner: UserId,
    }

    async fn setup() -> Fixture {
        let db = test_db().await;
        let admin = create_admin(&db, "admin").await;
        let learner = create_user(&db, "learner").await;
        let roles = RoleGate::new(db.clone());
        Fixture {
            progress: ProgressService::new(db.clone()),
            projects: ProjectsService::new(db.clone(), roles.clone()),
            members: MembersService::new(db, roles),
            admin,
            learner,
        }
    }

    /// Project with `n` steps and the learner enrolled.
    async fn enrolled_project(f: &Fixture, n: usize) -> (ProjectId, Vec<ContentId>) {
        let p = f.projects._create_project(f.admin, project("p")).await.unwrap();
        let mut steps = Vec::new();
        for i in 0..n {
            let c = f
                .projects
                ._add_content(f.admin, p.id, step(&format!("step {i}")))
                .await
                .unwrap();
            steps.push(c.id);
        }
        f.members._add_member(f.admin, p.id, f.learner).await.unwrap();
        (p.id, steps)
    }

    #[tokio::test]
    async fn test_two_of_four_steps_is_fifty_percent() {
        let f = setup().await;
        let (project_id, steps) = enrolled_project(&f, 4).await;

        f.progress._mark_complete(f.learner, project_id, steps[0]).await.unwrap();
        f.progress._mark_complete(f.learner, project_id, steps[2]).await.unwrap();

        let p = f.progress._project_progress(f.learner, project_id).await.unwrap();
        assert_eq!((p.total, p.completed, p.percent), (4, 2, 50));
        let done: Vec<bool> = p.steps.iter().map(|s| s.done).collect();
        assert_eq!(done, vec![true, false, true, false]);
    }

    #[tokio::test]
    async fn test_mark_complete_twice_keeps_one_row() {
        let f = setup().await;
        let (project_id, steps) = enrolled_project(&f, 3).await;

        let first = f.progress._mark_complete(f.learner, project_id, steps[1]).await.unwrap();
        let second = f.progress._mark_complete(f.learner, project_id, steps[1]).await.unwrap();
        assert_eq!(first.id, second.id);

        let rows = ProjectProgression::find()
            .filter(ProjectProgressionColumn::UserId.eq(f.learner))
            .count(&f.progress.db)
            .await
            .unwrap();
        assert_eq!(rows, 1);

        let p = f.progress._project_progress(f.learner, project_id).await.unwrap();
        assert_eq!(p.percent, 33);
    }

    #[tokio::test]
    async fn test_partial_progress_does_not_complete() {
        let f = setup().await;
        let (project_id, steps) = enrolled_project(&f, 2).await;

        f.progress._set_progress(f.learner, project_id, steps[0], 60).await.unwrap();
        let p = f.progress._project_progress(f.learner, project_id).await.unwrap();
        assert_eq!(p.completed, 0);
        assert_eq!(p.steps[0].progress_num, 60);

        let out = f.progress._set_progress(f.learner, project_id, steps[0], 101).await;
        assert!(matches!(out, Err(ProgressServiceError::OutOfRange(101))));
    }

    #[tokio::test]
    async fn test_empty_project_is_zero_percent() {
        let f = setup().await;
        let (project_id, _) = enrolled_project(&f, 0).await;

        let p = f.progress._project_progress(f.learner, project_id).await.unwrap();
        assert_eq!((p.total, p.percent), (0, 0));

        let overall = f.progress._overall_progress(f.learner).await.unwrap();
        assert_eq!(overall.percent, 0);
        assert_eq!(overall.projects.len(), 1);
    }

    #[tokio::test]
    async fn test_overall_is_mean_of_projects() {
        let f = setup().await;
        let (full, full_steps) = enrolled_project(&f, 1).await;
        let (half, half_steps) = enrolled_project(&f, 2).await;
        enrolled_project(&f, 3).await;

        f.progress._mark_complete(f.learner, full, full_steps[0]).await.unwrap();
        f.progress._mark_complete(f.learner, half, half_steps[0]).await.unwrap();

        // (100 + 50 + 0) / 3
        let overall = f.progress._overall_progress(f.learner).await.unwrap();
        assert_eq!(overall.percent, 50);
    }

    #[tokio::test]
    async fn test_writes_need_membership_and_matching_project() {
        let f = setup().await;
        let (project_id, steps) = enrolled_project(&f, 1).await;
        let (other_project, _) = enrolled_project(&f, 1).await;
        let stranger = create_user(&f.progress.db, "stranger").await;

        let result = f.progress._mark_complete(stranger, project_id, steps[0]).await;
        assert!(matches!(result, Err(ProgressServiceError::NotMember)));

        let result = f.progress._mark_complete(f.learner, other_project, steps[0]).await;
        assert!(matches!(result, Err(ProgressServiceError::ContentNotFound)));
    }

    #[tokio::test]
    async fn test_deleted_step_stops_counting() {
        let f = setup().await;
        let (project_id, steps) = enrolled_project(&f, 2).await;
        f.progress._mark_complete(f.learner, project_id, steps[0]).await.unwrap();

        f.projects._delete_content(f.admin, steps[0]).await.unwrap();

        let p = f.progress._project_progress(f.learner, project_id).await.unwrap();
        assert_eq!((p.total, p.completed, p.percent), (1, 0, 0));
    }

    #[tokio::test]
    async fn test_percent_matches_rounding_for_many_sizes() {
        let f = setup().await;
        let (project_id, steps) = enrolled_project(&f, 7).await;

        for (k, content_id) in steps.iter().enumerate() {
            f.progress._mark_complete(f.learner, project_id, *content_id).await.unwrap();
            let p = f.progress._project_progress(f.learner, project_id).await.unwrap();
            let expected = (100.0 * (k + 1) as f64 / 7.0).round() as u8;
            assert_eq!(p.percent, expected);
        }
    }
}
