//! Read models for the screens of the app.
//!
//! Each page is assembled from the other services. Admin-only parts of a
//! page are `Option`s that stay `None` unless the viewer passes the role gate.

use std::collections::HashMap;

use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use zel_core::prelude::*;

use super::{
    avatars::{AvatarUrl, AvatarsService, AvatarsServiceError},
    events::{Attendance, EventsService, EventsServiceError},
    forum::{ForumService, ForumServiceError},
    members::{MemberEntry, MembersService, MembersServiceError},
    profiles::{ProfilesService, ProfilesServiceError},
    progress::{EventProgress, ProgressService, ProgressServiceError, ProjectProgress},
    projects::{ProjectsService, ProjectsServiceError},
    roles::RoleGate,
};
use crate::{
    entity::prelude::*,
    ids::{EventId, ForumPostId, ProjectId, UserId},
};

#[derive(Debug, Error)]
pub enum PagesServiceError {
    #[error("fatal database error")]
    DbError(#[from] DbErr),

    #[error(transparent)]
    Projects(#[from] ProjectsServiceError),

    #[error(transparent)]
    Members(#[from] MembersServiceError),

    #[error(transparent)]
    Progress(#[from] ProgressServiceError),

    #[error(transparent)]
    Events(#[from] EventsServiceError),

    #[error(transparent)]
    Forum(#[from] ForumServiceError),

    #[error(transparent)]
    Profiles(#[from] ProfilesServiceError),

    #[error(transparent)]
    Avatars(#[from] AvatarsServiceError),

    #[error("not signed in")]
    Unauthenticated,
}

impl From<PagesServiceError> for ResourceError {
    fn from(error: PagesServiceError) -> Self {
        match error {
            PagesServiceError::DbError(error) => ResourceError::infra(error),
            PagesServiceError::Projects(error) => error.into(),
            PagesServiceError::Members(error) => error.into(),
            PagesServiceError::Progress(error) => error.into(),
            PagesServiceError::Events(error) => error.into(),
            PagesServiceError::Forum(error) => error.into(),
            PagesServiceError::Profiles(error) => error.into(),
            PagesServiceError::Avatars(error) => error.into(),
            PagesServiceError::Unauthenticated => ResourceError::app(error),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectCard {
    pub project: ProjectModel,
    pub progress: ProjectProgress,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dashboard {
    pub username: String,
    pub avatar: Option<AvatarUrl>,
    pub overall_percent: u8,
    pub projects: Vec<ProjectCard>,
    pub events: Vec<EventModel>,
}

/// Member management, shown to admins only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectAdminPanel {
    pub members: Vec<MemberEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPage {
    pub project: ProjectModel,
    pub contents: Vec<ProjectContentModel>,
    pub enrolled: bool,
    /// Present once the viewer is enrolled.
    pub progress: Option<ProjectProgress>,
    pub admin: Option<ProjectAdminPanel>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    pub user_id: UserId,
    pub username: Option<String>,
    pub registered_at: String,
}

/// Content management and the attendee list, shown to admins only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAdminPanel {
    pub attendees: Vec<Attendee>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPage {
    pub event: EventModel,
    pub organizer: Option<String>,
    pub attendance: Attendance,
    pub registered: bool,
    pub contents: Vec<EventContentModel>,
    pub progress: Option<EventProgress>,
    pub admin: Option<EventAdminPanel>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentEntry {
    pub comment: ForumCommentModel,
    pub author: Option<String>,
}

/// Post deletion, shown to admins only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForumModeration {
    pub post_id: ForumPostId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForumThread {
    pub post: ForumPostModel,
    pub author: Option<String>,
    pub comments: Vec<CommentEntry>,
    pub can_mark_solved: bool,
    pub moderation: Option<ForumModeration>,
}

#[derive(Clone)]
pub struct PagesService {
    db: DatabaseConnection,
    roles: RoleGate,
    projects: ProjectsService,
    members: MembersService,
    progress: ProgressService,
    events: EventsService,
    forum: ForumService,
    profiles: ProfilesService,
    avatars: AvatarsService,
}

impl PagesService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: DatabaseConnection,
        roles: RoleGate,
        projects: ProjectsService,
        members: MembersService,
        progress: ProgressService,
        events: EventsService,
        forum: ForumService,
        profiles: ProfilesService,
        avatars: AvatarsService,
    ) -> Self {
        Self {
            db,
            roles,
            projects,
            members,
            progress,
            events,
            forum,
            profiles,
            avatars,
        }
    }

    pub async fn _dashboard(&self, user_id: UserId) -> Result<Dashboard, PagesServiceError> {
        let profile = self.profiles._get_profile(user_id).await?;
        let overall = self.progress._overall_progress(user_id).await?;

        let enrolled = self.members._list_enrolled_projects(user_id).await?;
        let mut progress_by_project: HashMap<ProjectId, ProjectProgress> = overall
            .projects
            .into_iter()
            .map(|p| (p.project_id, p))
            .collect();

        let projects = enrolled
            .into_iter()
            .filter_map(|project| {
                progress_by_project
                    .remove(&project.id)
                    .map(|progress| ProjectCard { project, progress })
            })
            .collect();

        Ok(Dashboard {
            username: profile.username,
            avatar: self.avatars._current_avatar(user_id).await?,
            overall_percent: overall.percent,
            projects,
            events: self.events._list_registered_events(user_id).await?,
        })
    }

    pub async fn _project_page(
        &self,
        user_id: UserId,
        project_id: ProjectId,
    ) -> Result<ProjectPage, PagesServiceError> {
        let project = self.projects._get_project(project_id).await?;
        let contents = self.projects._list_contents(project_id).await?;
        let enrolled = self.members._is_member(project_id, user_id).await?;

        let progress = if enrolled {
            Some(self.progress._project_progress(user_id, project_id).await?)
        } else {
            None
        };

        let admin = if self.roles.is_admin(user_id).await? {
            Some(ProjectAdminPanel {
                members: self.members._list_members(project_id).await?,
            })
        } else {
            None
        };

        debug!(%user_id, %project_id, enrolled, "built project page");
        Ok(ProjectPage {
            project,
            contents,
            enrolled,
            progress,
            admin,
        })
    }

    pub async fn _event_page(
        &self,
        user_id: UserId,
        event_id: EventId,
    ) -> Result<EventPage, PagesServiceError> {
        let event = self.events._get_event(event_id).await?;
        let attendance = self.events._attendance(event_id).await?;
        let registered = self.events._is_registered(user_id, event_id).await?;
        let contents = self.events._list_event_contents(event_id).await?;

        let organizer = match event.created_by {
            Some(creator) => self.username(creator).await?,
            None => None,
        };

        let progress = if registered {
            Some(self.progress._event_progress(user_id, event_id).await?)
        } else {
            None
        };

        let admin = if self.roles.is_admin(user_id).await? {
            Some(EventAdminPanel {
                attendees: self.attendees(event_id).await?,
            })
        } else {
            None
        };

        Ok(EventPage {
            event,
            organizer,
            attendance,
            registered,
            contents,
            progress,
            admin,
        })
    }

    pub async fn _forum_thread(
        &self,
        user_id: UserId,
        post_id: ForumPostId,
    ) -> Result<ForumThread, PagesServiceError> {
        let post = self.forum._get_post(post_id).await?;
        let comments = self.forum._list_comments(post_id).await?;
        let is_admin = self.roles.is_admin(user_id).await?;

        let mut author_ids: Vec<UserId> = comments.iter().map(|c| c.author_id).collect();
        author_ids.extend(post.author_id);
        let names = self.usernames(author_ids).await?;

        let comments = comments
            .into_iter()
            .map(|comment| CommentEntry {
                author: names.get(&comment.author_id).cloned(),
                comment,
            })
            .collect();

        Ok(ForumThread {
            author: post.author_id.and_then(|id| names.get(&id).cloned()),
            can_mark_solved: is_admin || post.author_id == Some(user_id),
            moderation: is_admin.then_some(ForumModeration { post_id }),
            comments,
            post,
        })
    }

    async fn attendees(&self, event_id: EventId) -> Result<Vec<Attendee>, DbErr> {
        let registrations = EventRegistration::find()
            .filter(EventRegistrationColumn::EventId.eq(event_id))
            .order_by_asc(EventRegistrationColumn::RegisteredAt)
            .order_by_asc(EventRegistrationColumn::Id)
            .all(&self.db)
            .await?;

        let names = self
            .usernames(registrations.iter().map(|r| r.user_id).collect())
            .await?;

        Ok(registrations
            .into_iter()
            .map(|r| Attendee {
                username: names.get(&r.user_id).cloned(),
                user_id: r.user_id,
                registered_at: r.registered_at,
            })
            .collect())
    }

    async fn username(&self, user_id: UserId) -> Result<Option<String>, DbErr> {
        Ok(Profile::find_by_id(user_id)
            .one(&self.db)
            .await?
            .map(|p| p.username))
    }

    async fn usernames(&self, user_ids: Vec<UserId>) -> Result<HashMap<UserId, String>, DbErr> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        Ok(Profile::find()
            .filter(ProfileColumn::Id.is_in(user_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|p| (p.id, p.username))
            .collect())
    }

    async fn caller(&self, ctx: &RequestContext) -> Result<UserId, PagesServiceError> {
        super::session_user(&self.db, &ctx.connection().remote_id())
            .await?
            .ok_or(PagesServiceError::Unauthenticated)
    }
}

#[zel_service(name = "pages")]
trait Pages {
    #[method(name = "dashboard")]
    async fn dashboard(&self) -> Result<Dashboard, ResourceError>;

    #[method(name = "project_page")]
    async fn project_page(&self, project_id: ProjectId) -> Result<ProjectPage, ResourceError>;

    #[method(name = "event_page")]
    async fn event_page(&self, event_id: EventId) -> Result<EventPage, ResourceError>;

    #[method(name = "forum_thread")]
    async fn forum_thread(&self, post_id: ForumPostId) -> Result<ForumThread, ResourceError>;
}

#[async_trait]
impl PagesServer for PagesService {
    async fn dashboard(&self, ctx: RequestContext) -> Result<Dashboard, ResourceError> {
        let user_id = self.caller(&ctx).await?;
        Ok(self._dashboard(user_id).await?)
    }

    async fn project_page(
        &self,
        ctx: RequestContext,
        project_id: ProjectId,
    ) -> Result<ProjectPage, ResourceError> {
        let user_id = self.caller(&ctx).await?;
        Ok(self._project_page(user_id, project_id).await?)
    }

    async fn event_page(&self, ctx: RequestContext, event_id: EventId) -> Result<EventPage, ResourceError> {
        let user_id = self.caller(&ctx).await?;
        Ok(self._event_page(user_id, event_id).await?)
    }

    async fn forum_thread(
        &self,
        ctx: RequestContext,
        post_id: ForumPostId,
    ) -> Result<ForumThread, ResourceError> {
        let user_id = self.caller(&ctx).await?;
        Ok(self._forum_thread(user_id, post_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_db;
    use crate::service::{
        events::tests::event,
        forum::tests::post,
        projects::tests::{project, step},
        testing::{create_admin, create_user},
    };
    use crate::storage::{BlobStore, UrlSigner};

    struct Fixture {
        pages: PagesService,
        admin: UserId,
        learner: UserId,
    }

    async fn setup() -> Fixture {
        let db = test_db().await;
        let admin = create_admin(&db, "admin").await;
        let learner = create_user(&db, "learner").await;
        let roles = RoleGate::new(db.clone());
        let store = BlobStore::new(db.clone(), UrlSigner::new(b"page-test-signing-key", 60).unwrap());

        let pages = PagesService::new(
            db.clone(),
            roles.clone(),
            ProjectsService::new(db.clone(), roles.clone()),
            MembersService::new(db.clone(), roles.clone()),
            ProgressService::new(db.clone()),
            EventsService::new(db.clone(), roles.clone()),
            ForumService::new(db.clone(), roles),
            ProfilesService::new(db.clone()),
            AvatarsService::new(db, store, 1024),
        );

        Fixture {
            pages,
            admin,
            learner,
        }
    }

    #[tokio::test]
    async fn test_dashboard_shows_only_enrolled_projects() {
        let f = setup().await;
        let p = &f.pages;
        let enrolled = p.projects._create_project(f.admin, project("mine")).await.unwrap();
        p.projects._create_project(f.admin, project("not mine")).await.unwrap();
        let steps = [
            p.projects._add_content(f.admin, enrolled.id, step("a")).await.unwrap(),
            p.projects._add_content(f.admin, enrolled.id, step("b")).await.unwrap(),
            p.projects._add_content(f.admin, enrolled.id, step("c")).await.unwrap(),
            p.projects._add_content(f.admin, enrolled.id, step("d")).await.unwrap(),
        ];
        p.members._add_member(f.admin, enrolled.id, f.learner).await.unwrap();
        p.progress._mark_complete(f.learner, enrolled.id, steps[0].id).await.unwrap();
        p.progress._mark_complete(f.learner, enrolled.id, steps[3].id).await.unwrap();

        let dashboard = p._dashboard(f.learner).await.unwrap();
        assert_eq!(dashboard.username, "learner");
        assert_eq!(dashboard.projects.len(), 1);
        assert_eq!(dashboard.projects[0].project.id, enrolled.id);
        assert_eq!(dashboard.projects[0].progress.percent, 50);
        assert_eq!(dashboard.overall_percent, 50);
        assert_eq!(dashboard.avatar, None);
    }

    #[tokio::test]
    async fn test_dashboard_for_new_user_is_empty() {
        let f = setup().await;
        let dashboard = f.pages._dashboard(f.learner).await.unwrap();
        assert!(dashboard.projects.is_empty());
        assert!(dashboard.events.is_empty());
        assert_eq!(dashboard.overall_percent, 0);
    }

    #[tokio::test]
    async fn test_project_page_admin_panel_only_for_admins() {
        let f = setup().await;
        let p = &f.pages;
        let created = p.projects._create_project(f.admin, project("p")).await.unwrap();
        p.members._add_member(f.admin, created.id, f.learner).await.unwrap();

        let learner_view = p._project_page(f.learner, created.id).await.unwrap();
        assert!(learner_view.admin.is_none());
        assert!(learner_view.enrolled);
        assert!(learner_view.progress.is_some());

        let admin_view = p._project_page(f.admin, created.id).await.unwrap();
        let panel = admin_view.admin.expect("admin panel");
        assert_eq!(panel.members.len(), 1);
        assert!(!admin_view.enrolled);
        assert!(admin_view.progress.is_none());
    }

    #[tokio::test]
    async fn test_event_page() {
        let f = setup().await;
        let p = &f.pages;
        let e = p
            .events
            ._create_event(f.admin, event("meetup", "2025-06-01", "18:00", Some(4)))
            .await
            .unwrap();
        p.events._register(f.learner, e.id).await.unwrap();

        let learner_view = p._event_page(f.learner, e.id).await.unwrap();
        assert_eq!(learner_view.organizer.as_deref(), Some("admin"));
        assert!(learner_view.registered);
        assert_eq!(learner_view.attendance.count, 1);
        assert_eq!(learner_view.attendance.fill_percent, Some(25));
        assert!(!learner_view.attendance.full);
        assert!(learner_view.admin.is_none());

        let admin_view = p._event_page(f.admin, e.id).await.unwrap();
        assert!(!admin_view.registered);
        let attendees = admin_view.admin.expect("admin panel").attendees;
        assert_eq!(attendees.len(), 1);
        assert_eq!(attendees[0].username.as_deref(), Some("learner"));
    }

    #[tokio::test]
    async fn test_forum_thread_moderation() {
        let f = setup().await;
        let p = &f.pages;
        let created = p.forum._create_post(f.learner, post("q", "?")).await.unwrap();
        p.forum._add_comment(f.admin, created.id, "answer".to_string()).await.unwrap();

        let author_view = p._forum_thread(f.learner, created.id).await.unwrap();
        assert_eq!(author_view.author.as_deref(), Some("learner"));
        assert_eq!(author_view.comments[0].author.as_deref(), Some("admin"));
        assert!(author_view.can_mark_solved);
        assert!(author_view.moderation.is_none());

        let admin_view = p._forum_thread(f.admin, created.id).await.unwrap();
        assert_eq!(
            admin_view.moderation,
            Some(ForumModeration { post_id: created.id })
        );
    }
}
