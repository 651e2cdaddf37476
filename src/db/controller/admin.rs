use sea_orm::{entity::*, query::*, ConnectionTrait};
use chrono::Utc;

use crate::db::{IDType, model::{self, admin}};
use crate::log_info;
use super::Result;

/// Résultat de l'ajout d'un administrateur
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddAdmin {
    Created,
    Reactivated,
    AlreadyActive,
}

/// Résultat de la désactivation d'un administrateur
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveAdmin {
    Deactivated,
    AlreadyInactive,
    NotFound,
}

pub async fn find_admin<C: ConnectionTrait>(connector: &C, id: IDType) -> Result<Option<admin::Model>> {
    Ok(model::Admin::find_by_id(id).one(connector).await?)
}

pub async fn is_active_admin<C: ConnectionTrait>(connector: &C, id: IDType) -> Result<bool> {
    let count = model::Admin::find()
        .filter(admin::Column::Id.eq(id))
        .filter(admin::Column::IsActive.eq(true))
        .count(connector).await?;
    Ok(count > 0)
}

pub async fn add_admin<C: ConnectionTrait>(connector: &C, id: IDType, name: &str, handle: Option<&str>, is_senior: bool) -> Result<AddAdmin> {
    match find_admin(connector, id).await? {
        Some(existing) if existing.is_active => Ok(AddAdmin::AlreadyActive),
        Some(existing) => {
            let mut active_model: admin::ActiveModel = existing.into();
            active_model.is_active = Set(true);
            active_model.name = Set(name.to_string());
            active_model.handle = Set(handle.map(str::to_string));
            active_model.update(connector).await?;
            log_info!("Admin {} reactivated", id);
            Ok(AddAdmin::Reactivated)
        }
        None => {
            admin::ActiveModel {
                id: Set(id),
                name: Set(name.to_string()),
                handle: Set(handle.map(str::to_string)),
                is_senior: Set(is_senior),
                is_active: Set(true),
                created_at: Set(Utc::now()),
            }.insert(connector).await?;
            log_info!("Admin {} added", id);
            Ok(AddAdmin::Created)
        }
    }
}

pub async fn deactivate_admin<C: ConnectionTrait>(connector: &C, id: IDType) -> Result<RemoveAdmin> {
    let existing = match find_admin(connector, id).await? {
        Some(existing) => existing,
        None => return Ok(RemoveAdmin::NotFound),
    };
    if !existing.is_active {
        return Ok(RemoveAdmin::AlreadyInactive);
    }
    let mut active_model: admin::ActiveModel = existing.into();
    active_model.is_active = Set(false);
    active_model.update(connector).await?;
    log_info!("Admin {} deactivated", id);
    Ok(RemoveAdmin::Deactivated)
}

pub async fn list_active_admins<C: ConnectionTrait>(connector: &C) -> Result<Vec<admin::Model>> {
    Ok(model::Admin::find()
        .filter(admin::Column::IsActive.eq(true))
        .order_by_asc(admin::Column::CreatedAt)
        .all(connector).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_db;

    #[tokio::test]
    async fn reactivation_refreshes_identity() {
        let db = memory_db().await;
        assert_eq!(add_admin(&db, 4, "ancien", Some("ancien"), false).await.unwrap(), AddAdmin::Created);
        assert_eq!(deactivate_admin(&db, 4).await.unwrap(), RemoveAdmin::Deactivated);
        assert_eq!(deactivate_admin(&db, 4).await.unwrap(), RemoveAdmin::AlreadyInactive);
        assert_eq!(add_admin(&db, 4, "nouveau", Some("nouveau"), false).await.unwrap(), AddAdmin::Reactivated);
        let admin = find_admin(&db, 4).await.unwrap().unwrap();
        assert!(admin.is_active);
        assert_eq!(admin.name, "nouveau");
        assert_eq!(admin.handle.as_deref(), Some("nouveau"));
        assert_eq!(add_admin(&db, 4, "nouveau", None, false).await.unwrap(), AddAdmin::AlreadyActive);
        assert_eq!(deactivate_admin(&db, 99).await.unwrap(), RemoveAdmin::NotFound);
    }
}
