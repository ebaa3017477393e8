// SeaORM entities
// One module per table; `types` holds the enums and JSON columns they share
pub mod app_user;
pub mod event;
pub mod event_content;
pub mod event_progression;
pub mod event_registration;
pub mod forum_comment;
pub mod forum_post;
pub mod identity;
pub mod profile;
pub mod project;
pub mod project_content;
pub mod project_member;
pub mod project_progression;
pub mod storage_object;
pub mod types;
pub mod user_role;

#[cfg(test)]
mod tests;

pub mod prelude {
    // Re-export all entities for convenience
    pub use super::app_user::{
        ActiveModel as AppUserActiveModel, Column as AppUserColumn, Entity as AppUser,
        Model as AppUserModel,
    };
    pub use super::event::{
        ActiveModel as EventActiveModel, Column as EventColumn, Entity as Event,
        Model as EventModel,
    };
    pub use super::event_content::{
        ActiveModel as EventContentActiveModel, Column as EventContentColumn,
        Entity as EventContent, Model as EventContentModel,
    };
    pub use super::event_progression::{
        ActiveModel as EventProgressionActiveModel, Column as EventProgressionColumn,
        Entity as EventProgression, Model as EventProgressionModel,
    };
    pub use super::event_registration::{
        ActiveModel as EventRegistrationActiveModel, Column as EventRegistrationColumn,
        Entity as EventRegistration, Model as EventRegistrationModel,
    };
    pub use super::forum_comment::{
        ActiveModel as ForumCommentActiveModel, Column as ForumCommentColumn,
        Entity as ForumComment, Model as ForumCommentModel,
    };
    pub use super::forum_post::{
        ActiveModel as ForumPostActiveModel, Column as ForumPostColumn, Entity as ForumPost,
        Model as ForumPostModel,
    };
    pub use super::identity::{
        ActiveModel as IdentityActiveModel, Column as IdentityColumn, Entity as Identity,
        Model as IdentityModel,
    };
    pub use super::profile::{
        ActiveModel as ProfileActiveModel, Column as ProfileColumn, Entity as Profile,
        Model as ProfileModel,
    };
    pub use super::project::{
        ActiveModel as ProjectActiveModel, Column as ProjectColumn, Entity as Project,
        Model as ProjectModel,
    };
    pub use super::project_content::{
        ActiveModel as ProjectContentActiveModel, Column as ProjectContentColumn,
        Entity as ProjectContent, Model as ProjectContentModel,
    };
    pub use super::project_member::{
        ActiveModel as ProjectMemberActiveModel, Column as ProjectMemberColumn,
        Entity as ProjectMember, Model as ProjectMemberModel,
    };
    pub use super::project_progression::{
        ActiveModel as ProjectProgressionActiveModel, Column as ProjectProgressionColumn,
        Entity as ProjectProgression, Model as ProjectProgressionModel,
    };
    pub use super::storage_object::{
        ActiveModel as StorageObjectActiveModel, Column as StorageObjectColumn,
        Entity as StorageObject, Model as StorageObjectModel,
    };
    pub use super::types::{AppRole, ContentType, Tags};
    pub use super::user_role::{
        ActiveModel as UserRoleActiveModel, Column as UserRoleColumn, Entity as UserRole,
        Model as UserRoleModel,
    };

    // Re-export commonly used SeaORM types and traits
    pub use sea_orm::{
        ActiveModelTrait,
        ActiveValue,
        ColumnTrait,
        ConnectionTrait,
        // Database and connection types
        Database,
        DatabaseConnection,
        DatabaseTransaction,
        DbConn,
        // Common result types
        DbErr,
        // Core traits
        EntityTrait,
        ModelTrait,
        NotSet,
        PaginatorTrait,
        QueryFilter,
        QueryOrder,
        QuerySelect,
        Related,
        // Active model helpers
        Set,
        TransactionTrait,
        Unchanged,
    };
}
