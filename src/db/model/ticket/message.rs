use sea_orm::entity::prelude::*;
use super::TicketId;
use crate::db::IDType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(Some(8))")]
pub enum SenderRole {
    #[sea_orm(string_value = "user")]
    User,
    #[sea_orm(string_value = "admin")]
    Admin,
}

/// Entrée de la conversation d'un ticket. Jamais modifiée après création.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "helpdesk_ticket_message")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub ticket_id: TicketId,
    pub sender_id: IDType,
    pub sender_role: SenderRole,
    #[sea_orm(column_type = "Text", nullable)]
    pub text: Option<String>,
    /// Référence de la pièce jointe côté messagerie
    pub attachment: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::Entity",
        from = "Column::TicketId",
        to = "super::Column::Id",
        on_delete = "Cascade"
    )]
    Ticket,
}

impl Related<super::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ticket.def()
    }
}

impl ActiveModelBehavior for ActiveModel
{}
