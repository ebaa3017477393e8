#[cfg(test)]
mod entity_tests {
    use crate::entity::prelude::*;
    use crate::ids::*;
    use crate::models::test_db;

    async fn insert_user(db: &DatabaseConnection, name: &str) -> UserId {
        let user_id = UserId::new();
        let now = crate::time::now();

        AppUser::insert(AppUserActiveModel {
            id: Set(user_id),
            email: Set(format!("{name}@example.com")),
            password_hash: Set("hash".to_string()),
            created_at: Set(now.clone()),
        })
        .exec(db)
        .await
        .expect("Failed to insert user");

        Profile::insert(ProfileActiveModel {
            id: Set(user_id),
            username: Set(name.to_string()),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        })
        .exec(db)
        .await
        .expect("Failed to insert profile");

        user_id
    }

    async fn insert_project(db: &DatabaseConnection, tags: &[&str]) -> ProjectId {
        let project_id = ProjectId::new();
        Project::insert(ProjectActiveModel {
            id: Set(project_id),
            title: Set("Project".to_string()),
            description: Set(None),
            image_url: Set(None),
            tags: Set(Tags::normalized(tags)),
            author_id: Set(None),
            created_at: Set(crate::time::now()),
        })
        .exec(db)
        .await
        .expect("Failed to insert project");
        project_id
    }

    async fn insert_content(db: &DatabaseConnection, project_id: ProjectId) -> ContentId {
        let content_id = ContentId::new();
        ProjectContent::insert(ProjectContentActiveModel {
            id: Set(content_id),
            project_id: Set(project_id),
            title: Set("Step".to_string()),
            description: Set(None),
            content_type: Set(ContentType::Link),
            content_url: Set(Some("https://example.com".to_string())),
            author_id: Set(None),
            created_at: Set(crate::time::now()),
        })
        .exec(db)
        .await
        .expect("Failed to insert content");
        content_id
    }

    fn progression(
        project_id: ProjectId,
        user_id: UserId,
        content_id: ContentId,
    ) -> ProjectProgressionActiveModel {
        ProjectProgressionActiveModel {
            id: Set(ProgressionId::new()),
            project_id: Set(project_id),
            user_id: Set(user_id),
            content_id: Set(content_id),
            progress_num: Set(100),
            updated_at: Set(crate::time::now()),
        }
    }

    #[tokio::test]
    async fn test_tags_and_enums_round_trip() {
        let db = test_db().await;
        let project_id = insert_project(&db, &["rust", " web "]).await;
        let content_id = insert_content(&db, project_id).await;

        let project = Project::find_by_id(project_id).one(&db).await.unwrap().unwrap();
        assert_eq!(project.tags.as_slice(), &["rust".to_string(), "web".to_string()]);

        let content = ProjectContent::find_by_id(content_id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(content.content_type, ContentType::Link);
    }

    #[tokio::test]
    async fn test_username_is_unique() {
        let db = test_db().await;
        insert_user(&db, "ana").await;

        let user_id = UserId::new();
        AppUser::insert(AppUserActiveModel {
            id: Set(user_id),
            email: Set("other@example.com".to_string()),
            password_hash: Set("hash".to_string()),
            created_at: Set(crate::time::now()),
        })
        .exec(&db)
        .await
        .unwrap();

        let duplicate = Profile::insert(ProfileActiveModel {
            id: Set(user_id),
            username: Set("ana".to_string()),
            created_at: Set(crate::time::now()),
            updated_at: Set(crate::time::now()),
        })
        .exec(&db)
        .await;
        assert!(duplicate.is_err(), "username must be unique");
    }

    #[tokio::test]
    async fn test_progression_key_is_unique() {
        let db = test_db().await;
        let user_id = insert_user(&db, "ana").await;
        let project_id = insert_project(&db, &[]).await;
        let content_id = insert_content(&db, project_id).await;

        ProjectProgression::insert(progression(project_id, user_id, content_id))
            .exec(&db)
            .await
            .unwrap();
        let second = ProjectProgression::insert(progression(project_id, user_id, content_id))
            .exec(&db)
            .await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn test_member_and_registration_are_unique() {
        let db = test_db().await;
        let user_id = insert_user(&db, "ana").await;
        let project_id = insert_project(&db, &[]).await;

        let member = || ProjectMemberActiveModel {
            id: Set(MemberId::new()),
            project_id: Set(project_id),
            user_id: Set(user_id),
            role: Set("member".to_string()),
            created_at: Set(crate::time::now()),
        };
        ProjectMember::insert(member()).exec(&db).await.unwrap();
        assert!(ProjectMember::insert(member()).exec(&db).await.is_err());

        let event_id = EventId::new();
        Event::insert(EventActiveModel {
            id: Set(event_id),
            title: Set("Meetup".to_string()),
            description: Set(None),
            event_date: Set("2025-06-01".to_string()),
            event_time: Set("18:00".to_string()),
            max_attendees: Set(Some(10)),
            tags: Set(Tags::default()),
            created_by: Set(None),
            created_at: Set(crate::time::now()),
        })
        .exec(&db)
        .await
        .unwrap();

        let registration = || EventRegistrationActiveModel {
            id: Set(RegistrationId::new()),
            event_id: Set(event_id),
            user_id: Set(user_id),
            registered_at: Set(crate::time::now()),
        };
        EventRegistration::insert(registration()).exec(&db).await.unwrap();
        assert!(EventRegistration::insert(registration()).exec(&db).await.is_err());
    }

    #[tokio::test]
    async fn test_deleting_project_cascades() {
        let db = test_db().await;
        let user_id = insert_user(&db, "ana").await;
        let project_id = insert_project(&db, &[]).await;
        let content_id = insert_content(&db, project_id).await;
        ProjectProgression::insert(progression(project_id, user_id, content_id))
            .exec(&db)
            .await
            .unwrap();

        Project::delete_by_id(project_id).exec(&db).await.unwrap();

        assert_eq!(ProjectContent::find().count(&db).await.unwrap(), 0);
        assert_eq!(ProjectProgression::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_deleting_user_cascades_to_profile_and_roles() {
        let db = test_db().await;
        let user_id = insert_user(&db, "ana").await;
        UserRole::insert(UserRoleActiveModel {
            id: Set(RoleId::new()),
            user_id: Set(user_id),
            role: Set(AppRole::Admin),
        })
        .exec(&db)
        .await
        .unwrap();

        AppUser::delete_by_id(user_id).exec(&db).await.unwrap();

        assert!(Profile::find_by_id(user_id).one(&db).await.unwrap().is_none());
        assert_eq!(UserRole::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_find_related_contents() {
        let db = test_db().await;
        let project_id = insert_project(&db, &[]).await;
        insert_content(&db, project_id).await;
        insert_content(&db, project_id).await;
        insert_content(&db, insert_project(&db, &[]).await).await;

        let project = Project::find_by_id(project_id).one(&db).await.unwrap().unwrap();
        let contents = project
            .find_related(ProjectContent)
            .all(&db)
            .await
            .unwrap();
        assert_eq!(contents.len(), 2);
    }
}
