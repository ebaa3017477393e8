use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use zel_core::prelude::*;

use super::{non_blank, roles::RoleGate};
use crate::{
    entity::prelude::*,
    ids::{CommentId, ForumPostId, UserId},
};

#[derive(Debug, Error)]
pub enum ForumServiceError {
    #[error("fatal database error")]
    DbError(#[from] DbErr),

    #[error("post not found")]
    PostNotFound,

    #[error("comment not found")]
    CommentNotFound,

    #[error("unauthorized: not the author or an admin")]
    Unauthorized,

    #[error("not signed in")]
    Unauthenticated,

    #[error("invalid input: {0}")]
    Validation(&'static str),
}

impl From<ForumServiceError> for ResourceError {
    fn from(error: ForumServiceError) -> Self {
        match error {
            ForumServiceError::DbError(error) => ResourceError::infra(error),
            ForumServiceError::PostNotFound => ResourceError::app(error),
            ForumServiceError::CommentNotFound => ResourceError::app(error),
            ForumServiceError::Unauthorized => ResourceError::app(error),
            ForumServiceError::Unauthenticated => ResourceError::app(error),
            ForumServiceError::Validation(_) => ResourceError::app(error),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub category: Option<String>,
}

fn required(value: &str, message: &'static str) -> Result<String, ForumServiceError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ForumServiceError::Validation(message));
    }
    Ok(value.to_string())
}

#[derive(Clone)]
pub struct ForumService {
    db: DatabaseConnection,
    roles: RoleGate,
}

impl ForumService {
    pub fn new(db: DatabaseConnection, roles: RoleGate) -> Self {
        Self { db, roles }
    }

    pub async fn _create_post(
        &self,
        author_id: UserId,
        post: NewPost,
    ) -> Result<ForumPostModel, ForumServiceError> {
        let title = required(&post.title, "title is required")?;
        let content = required(&post.content, "content is required")?;

        let post = ForumPostActiveModel {
            id: Set(ForumPostId::new()),
            author_id: Set(Some(author_id)),
            title: Set(title),
            content: Set(content),
            category: Set(non_blank(post.category)),
            solved: Set(false),
            created_at: Set(crate::time::now()),
        };

        let post = ForumPost::insert(post).exec_with_returning(&self.db).await?;

        info!(post_id = %post.id, %author_id, "post created");
        Ok(post)
    }

    /// All posts, newest first
    pub async fn _list_posts(&self) -> Result<Vec<ForumPostModel>, ForumServiceError> {
        let posts = ForumPost::find()
            .order_by_desc(ForumPostColumn::CreatedAt)
            .order_by_desc(ForumPostColumn::Id)
            .all(&self.db)
            .await?;

        Ok(posts)
    }

    pub async fn _get_post(&self, post_id: ForumPostId) -> Result<ForumPostModel, ForumServiceError> {
        ForumPost::find_by_id(post_id)
            .one(&self.db)
            .await?
            .ok_or(ForumServiceError::PostNotFound)
    }

    pub async fn _add_comment(
        &self,
        author_id: UserId,
        post_id: ForumPostId,
        content: String,
    ) -> Result<ForumCommentModel, ForumServiceError> {
        let content = required(&content, "comment is required")?;
        self._get_post(post_id).await?;

        let comment = ForumCommentActiveModel {
            id: Set(CommentId::new()),
            post_id: Set(post_id),
            author_id: Set(author_id),
            content: Set(content),
            created_at: Set(crate::time::now()),
        };

        let comment = ForumComment::insert(comment)
            .exec_with_returning(&self.db)
            .await?;

        info!(%post_id, comment_id = %comment.id, "comment added");
        Ok(comment)
    }

    /// A post's comments, oldest first
    pub async fn _list_comments(
        &self,
        post_id: ForumPostId,
    ) -> Result<Vec<ForumCommentModel>, ForumServiceError> {
        let comments = ForumComment::find()
            .filter(ForumCommentColumn::PostId.eq(post_id))
            .order_by_asc(ForumCommentColumn::CreatedAt)
            .order_by_asc(ForumCommentColumn::Id)
            .all(&self.db)
            .await?;

        Ok(comments)
    }

    /// Flag a post as solved or open again (author or admin)
    pub async fn _set_solved(
        &self,
        user_id: UserId,
        post_id: ForumPostId,
        solved: bool,
    ) -> Result<ForumPostModel, ForumServiceError> {
        let post = self._get_post(post_id).await?;

        if post.author_id != Some(user_id) && !self.roles.is_admin(user_id).await? {
            return Err(ForumServiceError::Unauthorized);
        }

        if post.solved == solved {
            return Ok(post);
        }

        let mut post: ForumPostActiveModel = post.into();
        post.solved = Set(solved);
        let post = post.update(&self.db).await?;

        info!(%post_id, solved, "post solved flag changed");
        Ok(post)
    }

    /// Delete a post and its comments (admins only)
    pub async fn _delete_post(
        &self,
        admin_id: UserId,
        post_id: ForumPostId,
    ) -> Result<(), ForumServiceError> {
        self.roles
            .require_admin(admin_id, ForumServiceError::Unauthorized)
            .await?;

        let result = ForumPost::delete_by_id(post_id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(ForumServiceError::PostNotFound);
        }

        info!(%post_id, "post deleted");
        Ok(())
    }

    pub async fn _delete_comment(
        &self,
        user_id: UserId,
        comment_id: CommentId,
    ) -> Result<(), ForumServiceError> {
        let comment = ForumComment::find_by_id(comment_id)
            .one(&self.db)
            .await?
            .ok_or(ForumServiceError::CommentNotFound)?;

        if comment.author_id != user_id && !self.roles.is_admin(user_id).await? {
            return Err(ForumServiceError::Unauthorized);
        }

        ForumComment::delete_by_id(comment_id).exec(&self.db).await?;

        info!(%comment_id, "comment deleted");
        Ok(())
    }

    async fn caller(&self, ctx: &RequestContext) -> Result<UserId, ForumServiceError> {
        super::session_user(&self.db, &ctx.connection().remote_id())
            .await?
            .ok_or(ForumServiceError::Unauthenticated)
    }
}

#[zel_service(name = "forum")]
trait Forum {
    #[method(name = "create_post")]
    async fn create_post(&self, post: NewPost) -> Result<ForumPostModel, ResourceError>;

    #[doc = "List posts, newest first"]
    #[method(name = "list_posts")]
    async fn list_posts(&self) -> Result<Vec<ForumPostModel>, ResourceError>;

    #[method(name = "get_post")]
    async fn get_post(&self, post_id: ForumPostId) -> Result<ForumPostModel, ResourceError>;

    #[method(name = "add_comment")]
    async fn add_comment(
        &self,
        post_id: ForumPostId,
        content: String,
    ) -> Result<ForumCommentModel, ResourceError>;

    #[doc = "List a post's comments, oldest first"]
    #[method(name = "list_comments")]
    async fn list_comments(&self, post_id: ForumPostId)
        -> Result<Vec<ForumCommentModel>, ResourceError>;

    #[method(name = "set_solved")]
    async fn set_solved(
        &self,
        post_id: ForumPostId,
        solved: bool,
    ) -> Result<ForumPostModel, ResourceError>;

    #[doc = "Delete a post (admins only)"]
    #[method(name = "delete_post")]
    async fn delete_post(&self, post_id: ForumPostId) -> Result<(), ResourceError>;

    #[method(name = "delete_comment")]
    async fn delete_comment(&self, comment_id: CommentId) -> Result<(), ResourceError>;
}

#[async_trait]
impl ForumServer for ForumService {
    async fn create_post(
        &self,
        ctx: RequestContext,
        post: NewPost,
    ) -> Result<ForumPostModel, ResourceError> {
        let author_id = self.caller(&ctx).await?;
        Ok(self._create_post(author_id, post).await?)
    }

    async fn list_posts(&self, _ctx: RequestContext) -> Result<Vec<ForumPostModel>, ResourceError> {
        Ok(self._list_posts().await?)
    }

    async fn get_post(
        &self,
        _ctx: RequestContext,
        post_id: ForumPostId,
    ) -> Result<ForumPostModel, ResourceError> {
        Ok(self._get_post(post_id).await?)
    }

    async fn add_comment(
        &self,
        ctx: RequestContext,
        post_id: ForumPostId,
        content: String,
    ) -> Result<ForumCommentModel, ResourceError> {
        let author_id = self.caller(&ctx).await?;
        Ok(self._add_comment(author_id, post_id, content).await?)
    }

    async fn list_comments(
        &self,
        _ctx: RequestContext,
        post_id: ForumPostId,
    ) -> Result<Vec<ForumCommentModel>, ResourceError> {
        Ok(self._list_comments(post_id).await?)
    }

    async fn set_solved(
        &self,
        ctx: RequestContext,
        post_id: ForumPostId,
        solved: bool,
    ) -> Result<ForumPostModel, ResourceError> {
        let user_id = self.caller(&ctx).await?;
        Ok(self._set_solved(user_id, post_id, solved).await?)
    }

    async fn delete_post(&self, ctx: RequestContext, post_id: ForumPostId) -> Result<(), ResourceError> {
        let admin_id = self.caller(&ctx).await?;
        Ok(self._delete_post(admin_id, post_id).await?)
    }

    async fn delete_comment(
        &self,
        ctx: RequestContext,
        comment_id: CommentId,
    ) -> Result<(), ResourceError> {
        let user_id = self.caller(&ctx).await?;
        Ok(self._delete_comment(user_id, comment_id).await?)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::test_db;
    use crate::service::testing::{create_admin, create_user};

    pub(crate) fn post(title: &str, content: &str) -> NewPost {
        NewPost {
            title: title.to_string(),
            content: content.to_string(),
            category: None,
        }
    }

    async fn setup_test_service() -> ForumService {
        let db = test_db().await;
        ForumService::new(db.clone(), RoleGate::new(db))
    }

    #[tokio::test]
    async fn test_create_post_requires_text() {
        let service = setup_test_service().await;
        let ana = create_user(&service.db, "ana").await;

        let blank = service._create_post(ana, post("  ", "body")).await;
        assert!(matches!(blank, Err(ForumServiceError::Validation(_))));

        let created = service
            ._create_post(
                ana,
                NewPost {
                    category: Some(" rust ".to_string()),
                    ..post("How do lifetimes work?", "Confused")
                },
            )
            .await
            .unwrap();
        assert_eq!(created.category.as_deref(), Some("rust"));
        assert!(!created.solved);
    }

    #[tokio::test]
    async fn test_posts_newest_first_comments_oldest_first() {
        let service = setup_test_service().await;
        let ana = create_user(&service.db, "ana").await;

        let first = service._create_post(ana, post("first", "a")).await.unwrap();
        service._create_post(ana, post("second", "b")).await.unwrap();

        let titles: Vec<String> = service
            ._list_posts()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, vec!["second", "first"]);

        for text in ["one", "two", "three"] {
            service._add_comment(ana, first.id, text.to_string()).await.unwrap();
        }
        let comments: Vec<String> = service
            ._list_comments(first.id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.content)
            .collect();
        assert_eq!(comments, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_solved_by_author_or_admin() {
        let service = setup_test_service().await;
        let ana = create_user(&service.db, "ana").await;
        let bob = create_user(&service.db, "bob").await;
        let admin = create_admin(&service.db, "admin").await;
        let p = service._create_post(ana, post("q", "?")).await.unwrap();

        let denied = service._set_solved(bob, p.id, true).await;
        assert!(matches!(denied, Err(ForumServiceError::Unauthorized)));

        assert!(service._set_solved(ana, p.id, true).await.unwrap().solved);
        assert!(!service._set_solved(admin, p.id, false).await.unwrap().solved);
    }

    #[tokio::test]
    async fn test_delete_post_is_admin_only_and_cascades() {
        let service = setup_test_service().await;
        let ana = create_user(&service.db, "ana").await;
        let admin = create_admin(&service.db, "admin").await;
        let p = service._create_post(ana, post("q", "?")).await.unwrap();
        service._add_comment(ana, p.id, "bump".to_string()).await.unwrap();

        let denied = service._delete_post(ana, p.id).await;
        assert!(matches!(denied, Err(ForumServiceError::Unauthorized)));

        service._delete_post(admin, p.id).await.unwrap();
        assert!(service._list_comments(p.id).await.unwrap().is_empty());
        assert!(matches!(
            service._get_post(p.id).await,
            Err(ForumServiceError::PostNotFound)
        ));
    }

    #[tokio::test]
    async fn test_delete_comment_by_author_or_admin() {
        let service = setup_test_service().await;
        let ana = create_user(&service.db, "ana").await;
        let bob = create_user(&service.db, "bob").await;
        let admin = create_admin(&service.db, "admin").await;
        let p = service._create_post(ana, post("q", "?")).await.unwrap();
        let c1 = service._add_comment(bob, p.id, "one".to_string()).await.unwrap();
        let c2 = service._add_comment(bob, p.id, "two".to_string()).await.unwrap();

        let denied = service._delete_comment(ana, c1.id).await;
        assert!(matches!(denied, Err(ForumServiceError::Unauthorized)));

        service._delete_comment(bob, c1.id).await.unwrap();
        service._delete_comment(admin, c2.id).await.unwrap();
        assert!(service._list_comments(p.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_comment_on_missing_post() {
        let service = setup_test_service().await;
        let ana = create_user(&service.db, "ana").await;

        let result = service
            ._add_comment(ana, ForumPostId::new(), "hello".to_string())
            .await;
        assert!(matches!(result, Err(ForumServiceError::PostNotFound)));
    }
}
