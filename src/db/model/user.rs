use sea_orm::entity::prelude::*;

use crate::db::{IDType, model::ticket};

/// Demandeur. Créé à la première interaction, jamais supprimé.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "helpdesk_user")]
pub struct Model {
    /// Identifiant de l'acteur côté messagerie
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: IDType,
    pub name: String,
    pub handle: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "ticket::Entity")]
    OpenedTickets,
}

impl Related<ticket::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OpenedTickets.def()
    }
}

impl ActiveModelBehavior for ActiveModel
{}
