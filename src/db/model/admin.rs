use sea_orm::entity::prelude::*;

use crate::db::IDType;

/// Administrateur ajouté par un senior.
///
/// La désactivation est un simple drapeau, la ligne n'est jamais supprimée.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "helpdesk_admin")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: IDType,
    pub name: String,
    pub handle: Option<String>,
    pub is_senior: bool,
    pub is_active: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel
{}

impl Model {
    pub fn display_name(&self) -> String {
        match &self.handle {
            Some(handle) => format!("@{}", handle),
            None => self.name.clone(),
        }
    }
}
