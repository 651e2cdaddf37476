use sea_orm::{entity::*, ConnectionTrait};
use chrono::Utc;

use crate::db::{IDType, model::{self, user}};
use crate::log_info;
use super::Result;

/// Enregistre l'utilisateur à sa première interaction, ou rafraîchit son
/// nom et son pseudo ensuite.
pub async fn upsert_user<C: ConnectionTrait>(connector: &C, id: IDType, name: &str, handle: Option<&str>) -> Result<user::Model> {
    let handle = handle.map(str::to_string);
    match model::User::find_by_id(id).one(connector).await? {
        Some(existing) if existing.name == name && existing.handle == handle => Ok(existing),
        Some(existing) => {
            let mut active_model: user::ActiveModel = existing.into();
            active_model.name = Set(name.to_string());
            active_model.handle = Set(handle);
            Ok(active_model.update(connector).await?)
        }
        None => {
            let active_model = user::ActiveModel {
                id: Set(id),
                name: Set(name.to_string()),
                handle: Set(handle),
                created_at: Set(Utc::now()),
            };
            let user = active_model.insert(connector).await?;
            log_info!("User {} added", id);
            Ok(user)
        }
    }
}
