pub mod message;

pub use Entity as Ticket;
pub use message::Entity as TicketMessage;

use std::{fmt, str::FromStr};
use sea_orm::entity::prelude::*;
use crate::db::{
    IDType,
    model::user
};

/// Identifiant interne d'un ticket
pub type TicketId = i32;

/// État d'un ticket. Les transitions sont décrites dans [`crate::tickets::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum TicketStatus {
    #[sea_orm(string_value = "new")]
    New,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "on_hold")]
    OnHold,
    #[sea_orm(string_value = "closed")]
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum TicketCategory {
    #[sea_orm(string_value = "network")]
    Network,
    #[sea_orm(string_value = "software")]
    Software,
    #[sea_orm(string_value = "hardware")]
    Hardware,
    #[sea_orm(string_value = "access")]
    Access,
    #[sea_orm(string_value = "other")]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum TicketPriority {
    #[sea_orm(string_value = "low")]
    Low,
    #[sea_orm(string_value = "medium")]
    Medium,
    #[sea_orm(string_value = "high")]
    High,
}

/// Valeur textuelle refusée lors de la conversion d'une énumération.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} inconnu(e) : {}", self.kind, self.value)
    }
}

macro_rules! text_enum {
    ($ty:ty, $kind:literal, { $($text:literal => $variant:path),* $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match *self {
                    $($variant => $text,)*
                }
            }
        }
        impl FromStr for $ty {
            type Err = UnknownVariant;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($variant),)*
                    other => Err(UnknownVariant { kind: $kind, value: other.to_string() }),
                }
            }
        }
    };
}

text_enum!(TicketStatus, "Statut", {
    "new" => TicketStatus::New,
    "in_progress" => TicketStatus::InProgress,
    "on_hold" => TicketStatus::OnHold,
    "closed" => TicketStatus::Closed,
});
text_enum!(TicketCategory, "Catégorie", {
    "network" => TicketCategory::Network,
    "software" => TicketCategory::Software,
    "hardware" => TicketCategory::Hardware,
    "access" => TicketCategory::Access,
    "other" => TicketCategory::Other,
});
text_enum!(TicketPriority, "Priorité", {
    "low" => TicketPriority::Low,
    "medium" => TicketPriority::Medium,
    "high" => TicketPriority::High,
});

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "helpdesk_ticket")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: TicketId,
    /// Numéro présenté aux humains, ex: `#00001`
    #[sea_orm(unique)]
    pub ticket_number: String,
    pub user_id: IDType,
    /// Administrateur assigné, uniquement en `in_progress` ou `on_hold`
    pub admin_id: Option<IDType>,
    pub category: TicketCategory,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    /// Renseigné si et seulement si le ticket est fermé
    pub closed_at: Option<DateTimeUtc>,
    pub rating: Option<i32>,
    /// Message représentant le ticket dans le salon des administrateurs
    pub message_id: Option<IDType>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "user::Entity",
        from = "Column::UserId",
        to = "user::Column::Id"
    )]
    OpenedBy,
    #[sea_orm(has_many = "message::Entity")]
    Messages,
}

impl Related<user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OpenedBy.def()
    }
}
impl Related<message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Messages.def()
    }
}

impl ActiveModelBehavior for ActiveModel
{}

impl Model {
    pub fn is_closed(&self) -> bool {
        self.status.is_terminal()
    }
}
