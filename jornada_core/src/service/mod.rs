use iroh::PublicKey;
use sea_orm::{ConnectionTrait, DbErr, EntityTrait};

use crate::{entity::prelude::Identity, ids::UserId};

pub mod auth;
pub mod avatars;
pub mod events;
pub mod forum;
pub mod members;
pub mod pages;
pub mod profiles;
pub mod progress;
pub mod projects;
pub mod roles;

/// User signed in on `node_id`, if any.
pub(crate) async fn session_user<C: ConnectionTrait>(
    db: &C,
    node_id: &PublicKey,
) -> Result<Option<UserId>, DbErr> {
    let identity = Identity::find_by_id(node_id.as_bytes().to_vec())
        .one(db)
        .await?;

    Ok(identity.map(|identity| identity.user_id))
}

/// Trims a form field; blank becomes `None`.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
