use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement, Value};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use zel_core::prelude::*;

use super::{
    non_blank,
    projects::{required_title, NewContent},
    roles::RoleGate,
};
use crate::{
    entity::prelude::*,
    ids::{EventContentId, EventId, RegistrationId, UserId},
    progress,
};

#[derive(Debug, Error)]
pub enum EventsServiceError {
    #[error("fatal database error")]
    DbError(#[from] DbErr),

    #[error("event not found")]
    EventNotFound,

    #[error("event content not found")]
    ContentNotFound,

    #[error("event is full")]
    EventFull,

    #[error("user is not registered for this event")]
    NotRegistered,

    #[error("unauthorized: admin role required")]
    Unauthorized,

    #[error("not signed in")]
    Unauthenticated,

    #[error("invalid input: {0}")]
    Validation(&'static str),
}

impl From<EventsServiceError> for ResourceError {
    fn from(error: EventsServiceError) -> Self {
        match error {
            EventsServiceError::DbError(error) => ResourceError::infra(error),
            EventsServiceError::EventNotFound => ResourceError::app(error),
            EventsServiceError::ContentNotFound => ResourceError::app(error),
            EventsServiceError::EventFull => ResourceError::app(error),
            EventsServiceError::NotRegistered => ResourceError::app(error),
            EventsServiceError::Unauthorized => ResourceError::app(error),
            EventsServiceError::Unauthenticated => ResourceError::app(error),
            EventsServiceError::Validation(_) => ResourceError::app(error),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub description: Option<String>,
    /// `YYYY-MM-DD`
    pub event_date: String,
    /// `HH:MM`, seconds are accepted and dropped
    pub event_time: String,
    /// `None` or `Some(0)` means unlimited
    pub max_attendees: Option<i32>,
    pub tags: Vec<String>,
}

/// Head count of an event against its capacity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendance {
    pub count: u64,
    pub max_attendees: Option<i32>,
    pub fill_percent: Option<u8>,
    pub full: bool,
}

impl Attendance {
    pub fn new(count: u64, max_attendees: Option<i32>) -> Self {
        let full = max_attendees
            .and_then(|max| u64::try_from(max).ok())
            .is_some_and(|max| count >= max);
        Self {
            count,
            max_attendees,
            fill_percent: progress::fill_percent(count, max_attendees),
            full,
        }
    }
}

fn parse_date(raw: &str) -> Result<String, EventsServiceError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map(|date| date.format("%Y-%m-%d").to_string())
        .map_err(|_| EventsServiceError::Validation("event_date must be YYYY-MM-DD"))
}

fn parse_time(raw: &str) -> Result<String, EventsServiceError> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map(|time| time.format("%H:%M").to_string())
        .map_err(|_| EventsServiceError::Validation("event_time must be HH:MM"))
}

fn capacity(max_attendees: Option<i32>) -> Result<Option<i32>, EventsServiceError> {
    match max_attendees {
        Some(max) if max < 0 => Err(EventsServiceError::Validation(
            "max_attendees cannot be negative",
        )),
        Some(0) | None => Ok(None),
        Some(max) => Ok(Some(max)),
    }
}

async fn registration<C: ConnectionTrait>(
    db: &C,
    event_id: EventId,
    user_id: UserId,
) -> Result<Option<EventRegistrationModel>, DbErr> {
    EventRegistration::find()
        .filter(EventRegistrationColumn::EventId.eq(event_id))
        .filter(EventRegistrationColumn::UserId.eq(user_id))
        .one(db)
        .await
}

const REGISTER_ATTEMPTS: u64 = 3;

const INSERT_IF_SEAT_LEFT: &str = "\
    INSERT INTO event_registration (id, event_id, user_id, registered_at) \
    SELECT ?, ?, ?, ? \
    WHERE ? IS NULL \
       OR (SELECT COUNT(*) FROM event_registration WHERE event_id = ?) < ?";

async fn count_registrations<C: ConnectionTrait>(db: &C, event_id: EventId) -> Result<u64, DbErr> {
    EventRegistration::find()
        .filter(EventRegistrationColumn::EventId.eq(event_id))
        .count(db)
        .await
}

#[derive(Clone)]
pub struct EventsService {
    db: DatabaseConnection,
    roles: RoleGate,
}

impl EventsService {
    pub fn new(db: DatabaseConnection, roles: RoleGate) -> Self {
        Self { db, roles }
    }

    pub async fn _create_event(
        &self,
        admin_id: UserId,
        event: NewEvent,
    ) -> Result<EventModel, EventsServiceError> {
        self.roles
            .require_admin(admin_id, EventsServiceError::Unauthorized)
            .await?;

        let title = required_title(&event.title).map_err(EventsServiceError::Validation)?;

        let event = EventActiveModel {
            id: Set(EventId::new()),
            title: Set(title),
            description: Set(non_blank(event.description)),
            event_date: Set(parse_date(&event.event_date)?),
            event_time: Set(parse_time(&event.event_time)?),
            max_attendees: Set(capacity(event.max_attendees)?),
            tags: Set(Tags::normalized(event.tags)),
            created_by: Set(Some(admin_id)),
            created_at: Set(crate::time::now()),
        };

        let event = Event::insert(event).exec_with_returning(&self.db).await?;

        info!(event_id = %event.id, date = %event.event_date, "event created");
        Ok(event)
    }

    /// All events by date, then time
    pub async fn _list_events(&self) -> Result<Vec<EventModel>, EventsServiceError> {
        let events = Event::find()
            .order_by_asc(EventColumn::EventDate)
            .order_by_asc(EventColumn::EventTime)
            .order_by_asc(EventColumn::Id)
            .all(&self.db)
            .await?;

        Ok(events)
    }

    pub async fn _get_event(&self, event_id: EventId) -> Result<EventModel, EventsServiceError> {
        Event::find_by_id(event_id)
            .one(&self.db)
            .await?
            .ok_or(EventsServiceError::EventNotFound)
    }

    /// Delete an event; content, registrations and progress go with it
    pub async fn _delete_event(
        &self,
        admin_id: UserId,
        event_id: EventId,
    ) -> Result<(), EventsServiceError> {
        self.roles
            .require_admin(admin_id, EventsServiceError::Unauthorized)
            .await?;

        let result = Event::delete_by_id(event_id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(EventsServiceError::EventNotFound);
        }

        info!(%event_id, "event deleted");
        Ok(())
    }

    pub async fn _add_event_content(
        &self,
        admin_id: UserId,
        event_id: EventId,
        content: NewContent,
    ) -> Result<EventContentModel, EventsServiceError> {
        self.roles
            .require_admin(admin_id, EventsServiceError::Unauthorized)
            .await?;

        self._get_event(event_id).await?;

        let title = required_title(&content.title).map_err(EventsServiceError::Validation)?;

        let content = EventContentActiveModel {
            id: Set(EventContentId::new()),
            event_id: Set(event_id),
            title: Set(title),
            description: Set(non_blank(content.description)),
            content_type: Set(content.content_type),
            content_url: Set(non_blank(content.content_url)),
            author_id: Set(Some(admin_id)),
            created_at: Set(crate::time::now()),
        };

        let content = EventContent::insert(content)
            .exec_with_returning(&self.db)
            .await?;

        info!(%event_id, content_id = %content.id, "event content added");
        Ok(content)
    }

    pub async fn _list_event_contents(
        &self,
        event_id: EventId,
    ) -> Result<Vec<EventContentModel>, EventsServiceError> {
        self._get_event(event_id).await?;

        let contents = EventContent::find()
            .filter(EventContentColumn::EventId.eq(event_id))
            .order_by_asc(EventContentColumn::CreatedAt)
            .order_by_asc(EventContentColumn::Id)
            .all(&self.db)
            .await?;

        Ok(contents)
    }

    pub async fn _delete_event_content(
        &self,
        admin_id: UserId,
        content_id: EventContentId,
    ) -> Result<(), EventsServiceError> {
        self.roles
            .require_admin(admin_id, EventsServiceError::Unauthorized)
            .await?;

        let result = EventContent::delete_by_id(content_id)
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(EventsServiceError::ContentNotFound);
        }

        info!(%content_id, "event content deleted");
        Ok(())
    }

    /// Register a user. Registering again returns the existing row; a full
    /// event refuses new attendees.
    pub async fn _register(
        &self,
        user_id: UserId,
        event_id: EventId,
    ) -> Result<EventRegistrationModel, EventsServiceError> {
        let mut attempt = 0;
        loop {
            match self.try_register(user_id, event_id).await {
                // lock contention or a duplicate from a concurrent call; re-read and retry
                Err(EventsServiceError::DbError(error)) if attempt < REGISTER_ATTEMPTS => {
                    attempt += 1;
                    debug!(%event_id, %user_id, attempt, %error, "registration conflicted, retrying");
                    tokio::time::sleep(Duration::from_millis(10 * attempt)).await;
                }
                result => return result,
            }
        }
    }

    async fn try_register(
        &self,
        user_id: UserId,
        event_id: EventId,
    ) -> Result<EventRegistrationModel, EventsServiceError> {
        let event = Event::find_by_id(event_id)
            .one(&self.db)
            .await?
            .ok_or(EventsServiceError::EventNotFound)?;

        if let Some(existing) = registration(&self.db, event_id, user_id).await? {
            return Ok(existing);
        }

        // seat check and insert are one statement, so two callers cannot both
        // take the last seat
        let id = RegistrationId::new();
        let values: [Value; 7] = [
            id.into(),
            event_id.into(),
            user_id.into(),
            crate::time::now().into(),
            event.max_attendees.into(),
            event_id.into(),
            event.max_attendees.into(),
        ];
        let inserted = self
            .db
            .execute(Statement::from_sql_and_values(
                self.db.get_database_backend(),
                INSERT_IF_SEAT_LEFT,
                values,
            ))
            .await?;

        if inserted.rows_affected() == 0 {
            warn!(%event_id, %user_id, "registration refused, event full");
            return Err(EventsServiceError::EventFull);
        }

        let row = EventRegistration::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(DbErr::RecordNotInserted)?;

        info!(%event_id, %user_id, "registered");
        Ok(row)
    }

    pub async fn _unregister(
        &self,
        user_id: UserId,
        event_id: EventId,
    ) -> Result<(), EventsServiceError> {
        let result = EventRegistration::delete_many()
            .filter(EventRegistrationColumn::EventId.eq(event_id))
            .filter(EventRegistrationColumn::UserId.eq(user_id))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(EventsServiceError::NotRegistered);
        }

        info!(%event_id, %user_id, "unregistered");
        Ok(())
    }

    pub async fn _attendee_count(&self, event_id: EventId) -> Result<u64, EventsServiceError> {
        Ok(count_registrations(&self.db, event_id).await?)
    }

    pub async fn _attendance(&self, event_id: EventId) -> Result<Attendance, EventsServiceError> {
        let event = self._get_event(event_id).await?;
        let count = count_registrations(&self.db, event_id).await?;
        Ok(Attendance::new(count, event.max_attendees))
    }

    pub async fn _is_registered(
        &self,
        user_id: UserId,
        event_id: EventId,
    ) -> Result<bool, EventsServiceError> {
        Ok(registration(&self.db, event_id, user_id).await?.is_some())
    }

    /// Events the user signed up for, by date
    pub async fn _list_registered_events(
        &self,
        user_id: UserId,
    ) -> Result<Vec<EventModel>, EventsServiceError> {
        let event_ids: Vec<EventId> = EventRegistration::find()
            .filter(EventRegistrationColumn::UserId.eq(user_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|r| r.event_id)
            .collect();

        if event_ids.is_empty() {
            return Ok(Vec::new());
        }

        let events = Event::find()
            .filter(EventColumn::Id.is_in(event_ids))
            .order_by_asc(EventColumn::EventDate)
            .order_by_asc(EventColumn::EventTime)
            .order_by_asc(EventColumn::Id)
            .all(&self.db)
            .await?;

        debug!(%user_id, count = events.len(), "listed registered events");
        Ok(events)
    }

    async fn caller(&self, ctx: &RequestContext) -> Result<UserId, EventsServiceError> {
        super::session_user(&self.db, &ctx.connection().remote_id())
            .await?
            .ok_or(EventsServiceError::Unauthenticated)
    }
}

#[zel_service(name = "events")]
trait Events {
    #[doc = "Create an event (admins only)"]
    #[method(name = "create_event")]
    async fn create_event(&self, event: NewEvent) -> Result<EventModel, ResourceError>;

    #[doc = "List events by date and time"]
    #[method(name = "list_events")]
    async fn list_events(&self) -> Result<Vec<EventModel>, ResourceError>;

    #[method(name = "get_event")]
    async fn get_event(&self, event_id: EventId) -> Result<EventModel, ResourceError>;

    #[method(name = "delete_event")]
    async fn delete_event(&self, event_id: EventId) -> Result<(), ResourceError>;

    #[method(name = "add_event_content")]
    async fn add_event_content(
        &self,
        event_id: EventId,
        content: NewContent,
    ) -> Result<EventContentModel, ResourceError>;

    #[method(name = "list_event_contents")]
    async fn list_event_contents(
        &self,
        event_id: EventId,
    ) -> Result<Vec<EventContentModel>, ResourceError>;

    #[method(name = "delete_event_content")]
    async fn delete_event_content(&self, content_id: EventContentId) -> Result<(), ResourceError>;

    #[doc = "Register the signed-in user for an event"]
    #[method(name = "register")]
    async fn register(&self, event_id: EventId) -> Result<EventRegistrationModel, ResourceError>;

    #[method(name = "unregister")]
    async fn unregister(&self, event_id: EventId) -> Result<(), ResourceError>;

    #[method(name = "attendance")]
    async fn attendance(&self, event_id: EventId) -> Result<Attendance, ResourceError>;

    #[method(name = "is_registered")]
    async fn is_registered(&self, event_id: EventId) -> Result<bool, ResourceError>;

    #[method(name = "my_events")]
    async fn my_events(&self) -> Result<Vec<EventModel>, ResourceError>;
}

#[async_trait]
impl EventsServer for EventsService {
    async fn create_event(
        &self,
        ctx: RequestContext,
        event: NewEvent,
    ) -> Result<EventModel, ResourceError> {
        let admin_id = self.caller(&ctx).await?;
        Ok(self._create_event(admin_id, event).await?)
    }

    async fn list_events(&self, _ctx: RequestContext) -> Result<Vec<EventModel>, ResourceError> {
        Ok(self._list_events().await?)
    }

    async fn get_event(
        &self,
        _ctx: RequestContext,
        event_id: EventId,
    ) -> Result<EventModel, ResourceError> {
        Ok(self._get_event(event_id).await?)
    }

    async fn delete_event(&self, ctx: RequestContext, event_id: EventId) -> Result<(), ResourceError> {
        let admin_id = self.caller(&ctx).await?;
        Ok(self._delete_event(admin_id, event_id).await?)
    }

    async fn add_event_content(
        &self,
        ctx: RequestContext,
        event_id: EventId,
        content: NewContent,
    ) -> Result<EventContentModel, ResourceError> {
        let admin_id = self.caller(&ctx).await?;
        Ok(self._add_event_content(admin_id, event_id, content).await?)
    }

    async fn list_event_contents(
        &self,
        _ctx: RequestContext,
        event_id: EventId,
    ) -> Result<Vec<EventContentModel>, ResourceError> {
        Ok(self._list_event_contents(event_id).await?)
    }

    async fn delete_event_content(
        &self,
        ctx: RequestContext,
        content_id: EventContentId,
    ) -> Result<(), ResourceError> {
        let admin_id = self.caller(&ctx).await?;
        Ok(self._delete_event_content(admin_id, content_id).await?)
    }

    async fn register(
        &self,
        ctx: RequestContext,
        event_id: EventId,
    ) -> Result<EventRegistrationModel, ResourceError> {
        let user_id = self.caller(&ctx).await?;
        Ok(self._register(user_id, event_id).await?)
    }

    async fn unregister(&self, ctx: RequestContext, event_id: EventId) -> Result<(), ResourceError> {
        let user_id = self.caller(&ctx).await?;
        Ok(self._unregister(user_id, event_id).await?)
    }

    async fn attendance(
        &self,
        _ctx: RequestContext,
        event_id: EventId,
    ) -> Result<Attendance, ResourceError> {
        Ok(self._attendance(event_id).await?)
    }

    async fn is_registered(&self, ctx: RequestContext, event_id: EventId) -> Result<bool, ResourceError> {
        let user_id = self.caller(&ctx).await?;
        Ok(self._is_registered(user_id, event_id).await?)
    }

    async fn my_events(&self, ctx: RequestContext) -> Result<Vec<EventModel>, ResourceError> {
        let user_id = self.caller(&ctx).await?;
        Ok(self._list_registered_events(user_id).await?)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::test_db;
    use crate::service::{
        progress::{ProgressService, ProgressServiceError},
        projects::tests::step,
        testing::{create_admin, create_user},
    };

    pub(crate) fn event(title: &str, date: &str, time: &str, max: Option<i32>) -> NewEvent {
        NewEvent {
            title: title.to_string(),
            event_date: date.to_string(),
            event_time: time.to_string(),
            max_attendees: max,
            ..Default::default()
        }
    }

    async fn setup_test_service() -> (EventsService, UserId) {
        let db = test_db().await;
        let admin = create_admin(&db, "admin").await;
        (EventsService::new(db.clone(), RoleGate::new(db)), admin)
    }

    #[tokio::test]
    async fn test_create_event_validates_fields() {
        let (service, admin) = setup_test_service().await;

        let bad_date = service
            ._create_event(admin, event("e", "2025-13-01", "10:00", None))
            .await;
        assert!(matches!(bad_date, Err(EventsServiceError::Validation(_))));

        let bad_time = service
            ._create_event(admin, event("e", "2025-06-01", "25:00", None))
            .await;
        assert!(matches!(bad_time, Err(EventsServiceError::Validation(_))));

        let negative = service
            ._create_event(admin, event("e", "2025-06-01", "10:00", Some(-1)))
            .await;
        assert!(matches!(negative, Err(EventsServiceError::Validation(_))));

        let created = service
            ._create_event(admin, event("e", "2025-06-01", "10:00:00", Some(0)))
            .await
            .unwrap();
        assert_eq!(created.event_time, "10:00");
        assert_eq!(created.max_attendees, None);
    }

    #[tokio::test]
    async fn test_only_admins_create_events() {
        let (service, _) = setup_test_service().await;
        let user = create_user(&service.db, "user").await;

        let result = service
            ._create_event(user, event("e", "2025-06-01", "10:00", None))
            .await;
        assert!(matches!(result, Err(EventsServiceError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_list_events_by_date_then_time() {
        let (service, admin) = setup_test_service().await;
        for (title, date, time) in [
            ("late", "2025-06-02", "09:00"),
            ("afternoon", "2025-06-01", "15:00"),
            ("morning", "2025-06-01", "08:30"),
        ] {
            service
                ._create_event(admin, event(title, date, time, None))
                .await
                .unwrap();
        }

        let titles: Vec<String> = service
            ._list_events()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles, vec!["morning", "afternoon", "late"]);
    }

    #[tokio::test]
    async fn test_registering_twice_counts_once() {
        let (service, admin) = setup_test_service().await;
        let user = create_user(&service.db, "ana").await;
        let e = service
            ._create_event(admin, event("e", "2025-06-01", "10:00", None))
            .await
            .unwrap();

        let first = service._register(user, e.id).await.unwrap();
        let second = service._register(user, e.id).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(service._attendee_count(e.id).await.unwrap(), 1);
        assert!(service._is_registered(user, e.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_capacity_is_enforced() {
        let (service, admin) = setup_test_service().await;
        let ana = create_user(&service.db, "ana").await;
        let bob = create_user(&service.db, "bob").await;
        let e = service
            ._create_event(admin, event("e", "2025-06-01", "10:00", Some(1)))
            .await
            .unwrap();

        service._register(ana, e.id).await.unwrap();
        let full = service._register(bob, e.id).await;
        assert!(matches!(full, Err(EventsServiceError::EventFull)));

        // already registered attendees are not refused
        service._register(ana, e.id).await.unwrap();

        let attendance = service._attendance(e.id).await.unwrap();
        assert_eq!(attendance.count, 1);
        assert_eq!(attendance.fill_percent, Some(100));
        assert!(attendance.full);

        service._unregister(ana, e.id).await.unwrap();
        service._register(bob, e.id).await.unwrap();
    }

    async fn file_backed_service(dir: &std::path::Path) -> (EventsService, UserId) {
        let url = format!("sqlite://{}?mode=rwc", dir.join("events.sqlite").display());
        let db = sea_orm::Database::connect(&url).await.unwrap();
        db.execute_unprepared("PRAGMA journal_mode=WAL").await.unwrap();
        crate::models::migrate_up(&db).await.unwrap();

        let admin = create_admin(&db, "admin").await;
        (EventsService::new(db.clone(), RoleGate::new(db)), admin)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registrations_share_the_last_seat() {
        let dir = tempfile::tempdir().unwrap();
        let (service, admin) = file_backed_service(dir.path()).await;
        let ana = create_user(&service.db, "ana").await;
        let bob = create_user(&service.db, "bob").await;

        for round in 0..5 {
            let e = service
                ._create_event(admin, event(&format!("e{round}"), "2025-06-01", "10:00", Some(1)))
                .await
                .unwrap();

            let (a, b) = tokio::join!(
                {
                    let service = service.clone();
                    tokio::spawn(async move { service._register(ana, e.id).await })
                },
                {
                    let service = service.clone();
                    tokio::spawn(async move { service._register(bob, e.id).await })
                },
            );
            let results = [a.unwrap(), b.unwrap()];

            let taken = results.iter().filter(|r| r.is_ok()).count();
            let refused = results
                .iter()
                .filter(|r| matches!(r, Err(EventsServiceError::EventFull)))
                .count();
            assert_eq!((taken, refused), (1, 1), "round {round}: {results:?}");
            assert_eq!(service._attendee_count(e.id).await.unwrap(), 1);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_duplicate_registration_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let (service, admin) = file_backed_service(dir.path()).await;
        let ana = create_user(&service.db, "ana").await;
        let e = service
            ._create_event(admin, event("e", "2025-06-01", "10:00", None))
            .await
            .unwrap();

        let (a, b) = tokio::join!(service._register(ana, e.id), service._register(ana, e.id));
        assert_eq!(a.unwrap().id, b.unwrap().id);
        assert_eq!(service._attendee_count(e.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_registered_events() {
        let (service, admin) = setup_test_service().await;
        let ana = create_user(&service.db, "ana").await;
        let later = service
            ._create_event(admin, event("later", "2025-07-01", "10:00", None))
            .await
            .unwrap();
        let sooner = service
            ._create_event(admin, event("sooner", "2025-06-01", "10:00", None))
            .await
            .unwrap();
        service
            ._create_event(admin, event("skipped", "2025-06-15", "10:00", None))
            .await
            .unwrap();

        service._register(ana, later.id).await.unwrap();
        service._register(ana, sooner.id).await.unwrap();

        let ids: Vec<EventId> = service
            ._list_registered_events(ana)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![sooner.id, later.id]);
    }

    #[tokio::test]
    async fn test_delete_event_cascades() {
        let (service, admin) = setup_test_service().await;
        let ana = create_user(&service.db, "ana").await;
        let e = service
            ._create_event(admin, event("e", "2025-06-01", "10:00", None))
            .await
            .unwrap();
        service._add_event_content(admin, e.id, step("slides")).await.unwrap();
        service._register(ana, e.id).await.unwrap();

        service._delete_event(admin, e.id).await.unwrap();

        assert_eq!(service._attendee_count(e.id).await.unwrap(), 0);
        assert!(service._list_registered_events(ana).await.unwrap().is_empty());
        assert!(matches!(
            service._get_event(e.id).await,
            Err(EventsServiceError::EventNotFound)
        ));
    }

    #[tokio::test]
    async fn test_event_progress_follows_registration() {
        let (service, admin) = setup_test_service().await;
        let progress = ProgressService::new(service.db.clone());
        let ana = create_user(&service.db, "ana").await;
        let e = service
            ._create_event(admin, event("e", "2025-06-01", "10:00", None))
            .await
            .unwrap();
        let first = service._add_event_content(admin, e.id, step("one")).await.unwrap();
        service._add_event_content(admin, e.id, step("two")).await.unwrap();

        let refused = progress._mark_event_content_complete(ana, e.id, first.id).await;
        assert!(matches!(refused, Err(ProgressServiceError::NotRegistered)));

        service._register(ana, e.id).await.unwrap();
        progress._mark_event_content_complete(ana, e.id, first.id).await.unwrap();
        progress._mark_event_content_complete(ana, e.id, first.id).await.unwrap();

        let p = progress._event_progress(ana, e.id).await.unwrap();
        assert_eq!((p.total, p.completed, p.percent), (2, 1, 50));
    }
}
