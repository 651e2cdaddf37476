use sea_orm::{
    entity::*, query::*, ConnectionTrait, FromQueryResult, TransactionTrait,
    sea_query::{Expr, Func, SimpleExpr},
};
use chrono::{DateTime, Utc};

use crate::db::{
    model::{self, sequence, ticket::{self, message::{self, SenderRole}, TicketCategory, TicketId, TicketPriority, TicketStatus}},
    controller::{Error, Result},
    IDType, TICKET_SEQUENCE,
};
use crate::tickets::number;
use crate::log_info;

/// Données d'un ticket à créer.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub user_id: IDType,
    pub category: TicketCategory,
    pub priority: TicketPriority,
    pub description: String,
    pub attachment: Option<String>,
}

/// Effet d'une transition sur l'administrateur assigné.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    Keep,
    Assign(IDType),
    Clear,
}

/// Champs modifiables d'un ticket, sans changement de statut.
#[derive(Debug, Clone, Default)]
pub struct TicketChanges {
    pub category: Option<TicketCategory>,
    pub priority: Option<TicketPriority>,
    pub description: Option<String>,
    pub rating: Option<i32>,
    pub message_id: Option<IDType>,
}

impl TicketChanges {
    /// Vrai si le changement compte comme une activité sur le ticket.
    fn touches(&self) -> bool {
        self.category.is_some() || self.priority.is_some() || self.description.is_some() || self.rating.is_some()
    }
}

/// Filtre de listing. Les critères renseignés se cumulent.
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub statuses: Option<Vec<TicketStatus>>,
    pub user_id: Option<IDType>,
    pub admin_id: Option<IDType>,
    pub limit: Option<u64>,
}

/// Date de référence pour mesurer l'ancienneté d'un ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Since {
    Creation,
    LastUpdate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TicketStats {
    pub total: u64,
    pub by_status: Vec<(TicketStatus, u64)>,
    pub by_priority: Vec<(TicketPriority, u64)>,
    pub average_rating: Option<f64>,
}

#[derive(Debug, FromQueryResult)]
struct StatusCount {
    status: TicketStatus,
    count: i64,
}
#[derive(Debug, FromQueryResult)]
struct PriorityCount {
    priority: TicketPriority,
    count: i64,
}
#[derive(Debug, FromQueryResult)]
struct AverageRating {
    average: Option<f64>,
}

/// Incrémente la séquence des tickets et retourne la nouvelle valeur.
///
/// Doit être appelé dans la transaction de création.
async fn next_ticket_sequence<C: ConnectionTrait>(connector: &C) -> Result<i64> {
    let res = model::Sequence::update_many()
        .col_expr(sequence::Column::Value, Expr::col(sequence::Column::Value).add(1))
        .filter(sequence::Column::Name.eq(TICKET_SEQUENCE))
        .exec(connector).await?;
    if res.rows_affected == 0 {
        return Err(Error::MissingSequence(TICKET_SEQUENCE));
    }
    model::Sequence::find_by_id(TICKET_SEQUENCE.to_string())
        .one(connector).await?
        .map(|s| s.value)
        .ok_or(Error::MissingSequence(TICKET_SEQUENCE))
}

/// Crée un ticket et son premier message dans une même transaction.
pub async fn create_ticket<C: ConnectionTrait + TransactionTrait>(db: &C, new: NewTicket) -> Result<ticket::Model> {
    let txn = db.begin().await?;
    let sequence = next_ticket_sequence(&txn).await?;
    let now = Utc::now();
    let created = ticket::ActiveModel {
        ticket_number: Set(number::format(sequence)),
        user_id: Set(new.user_id),
        admin_id: Set(None),
        category: Set(new.category),
        priority: Set(new.priority),
        status: Set(TicketStatus::New),
        description: Set(new.description.clone()),
        created_at: Set(now),
        updated_at: Set(now),
        closed_at: Set(None),
        rating: Set(None),
        message_id: Set(None),
        ..Default::default()
    }.insert(&txn).await?;
    message::ActiveModel {
        ticket_id: Set(created.id),
        sender_id: Set(new.user_id),
        sender_role: Set(SenderRole::User),
        text: Set(Some(new.description).filter(|d| !d.is_empty())),
        attachment: Set(new.attachment),
        created_at: Set(now),
        ..Default::default()
    }.insert(&txn).await?;
    txn.commit().await?;
    log_info!("Ticket {} created by user {}", created.ticket_number, created.user_id);
    Ok(created)
}

pub async fn find_ticket<C: ConnectionTrait>(connector: &C, id: TicketId) -> Result<Option<ticket::Model>> {
    Ok(model::Ticket::find_by_id(id).one(connector).await?)
}

pub async fn find_ticket_by_number<C: ConnectionTrait>(connector: &C, ticket_number: &str) -> Result<Option<ticket::Model>> {
    Ok(model::Ticket::find()
        .filter(ticket::Column::TicketNumber.eq(ticket_number))
        .one(connector).await?)
}

/// Retrouve un ticket à partir de son message dans le salon des administrateurs.
pub async fn find_ticket_by_message<C: ConnectionTrait>(connector: &C, message_id: IDType) -> Result<Option<ticket::Model>> {
    Ok(model::Ticket::find()
        .filter(ticket::Column::MessageId.eq(message_id))
        .one(connector).await?)
}

/// Liste les tickets, du plus récent au plus ancien.
pub async fn list_tickets<C: ConnectionTrait>(connector: &C, filter: TicketFilter) -> Result<Vec<ticket::Model>> {
    let mut query = model::Ticket::find();
    if let Some(statuses) = filter.statuses {
        query = query.filter(ticket::Column::Status.is_in(statuses));
    }
    if let Some(user_id) = filter.user_id {
        query = query.filter(ticket::Column::UserId.eq(user_id));
    }
    if let Some(admin_id) = filter.admin_id {
        query = query.filter(ticket::Column::AdminId.eq(admin_id));
    }
    let mut query = query
        .order_by_desc(ticket::Column::CreatedAt)
        .order_by_desc(ticket::Column::Id);
    if let Some(limit) = filter.limit {
        query = query.limit(limit);
    }
    Ok(query.all(connector).await?)
}

/// Tickets d'un statut dont la date de référence précède `before`.
pub async fn stale_tickets<C: ConnectionTrait>(connector: &C, status: TicketStatus, since: Since, before: DateTime<Utc>) -> Result<Vec<ticket::Model>> {
    let column = match since {
        Since::Creation => ticket::Column::CreatedAt,
        Since::LastUpdate => ticket::Column::UpdatedAt,
    };
    Ok(model::Ticket::find()
        .filter(ticket::Column::Status.eq(status))
        .filter(column.lt(before))
        .order_by_asc(ticket::Column::Id)
        .all(connector).await?)
}

/// Change le statut d'un ticket si et seulement si son statut actuel fait
/// partie de `from`.
///
/// La condition est portée par l'UPDATE lui-même : deux appels concurrents ne
/// peuvent pas réussir tous les deux. Retourne `None` si la condition n'est
/// pas remplie (ticket absent ou déjà dans un autre état).
pub async fn transition<C: ConnectionTrait + TransactionTrait>(
    db: &C,
    id: TicketId,
    from: &[TicketStatus],
    to: TicketStatus,
    assignment: Assignment,
) -> Result<Option<ticket::Model>> {
    let now = Utc::now();
    let closed_at = match to {
        TicketStatus::Closed => Some(now),
        _ => None,
    };
    let txn = db.begin().await?;
    let mut update = model::Ticket::update_many()
        .col_expr(ticket::Column::Status, Expr::value(to))
        .col_expr(ticket::Column::UpdatedAt, Expr::value(now))
        .col_expr(ticket::Column::ClosedAt, Expr::value(closed_at))
        .filter(ticket::Column::Id.eq(id))
        .filter(ticket::Column::Status.is_in(from.iter().copied()));
    update = match assignment {
        Assignment::Keep => update,
        Assignment::Assign(admin_id) => update.col_expr(ticket::Column::AdminId, Expr::value(Some(admin_id))),
        Assignment::Clear => update.col_expr(ticket::Column::AdminId, Expr::value(Option::<IDType>::None)),
    };
    let res = update.exec(&txn).await?;
    if res.rows_affected == 0 {
        txn.rollback().await?;
        return Ok(None);
    }
    let updated = model::Ticket::find_by_id(id)
        .one(&txn).await?
        .ok_or(Error::NotFoundAfterInsert("ticket"))?;
    txn.commit().await?;
    log_info!("Ticket {} is now {}", updated.ticket_number, updated.status.as_str());
    Ok(Some(updated))
}

/// Modifie les champs d'un ticket. Retourne `None` si le ticket n'existe pas.
pub async fn update_ticket<C: ConnectionTrait>(connector: &C, id: TicketId, changes: TicketChanges) -> Result<Option<ticket::Model>> {
    let current = match model::Ticket::find_by_id(id).one(connector).await? {
        Some(ticket) => ticket,
        None => return Ok(None),
    };
    let touches = changes.touches();
    let mut active_model: ticket::ActiveModel = current.into();
    if let Some(category) = changes.category {
        active_model.category = Set(category);
    }
    if let Some(priority) = changes.priority {
        active_model.priority = Set(priority);
    }
    if let Some(description) = changes.description {
        active_model.description = Set(description);
    }
    if let Some(rating) = changes.rating {
        active_model.rating = Set(Some(rating));
    }
    if let Some(message_id) = changes.message_id {
        active_model.message_id = Set(Some(message_id));
    }
    if touches {
        active_model.updated_at = Set(Utc::now());
    }
    Ok(Some(active_model.update(connector).await?))
}

pub async fn append_message<C: ConnectionTrait>(
    connector: &C,
    ticket_id: TicketId,
    sender_id: IDType,
    sender_role: SenderRole,
    text: Option<String>,
    attachment: Option<String>,
) -> Result<message::Model> {
    Ok(message::ActiveModel {
        ticket_id: Set(ticket_id),
        sender_id: Set(sender_id),
        sender_role: Set(sender_role),
        text: Set(text),
        attachment: Set(attachment),
        created_at: Set(Utc::now()),
        ..Default::default()
    }.insert(connector).await?)
}

/// Messages d'un ticket, dans l'ordre chronologique.
pub async fn list_messages<C: ConnectionTrait>(connector: &C, ticket_id: TicketId) -> Result<Vec<message::Model>> {
    Ok(model::TicketMessage::find()
        .filter(message::Column::TicketId.eq(ticket_id))
        .order_by_asc(message::Column::CreatedAt)
        .order_by_asc(message::Column::Id)
        .all(connector).await?)
}

/// Efface l'historique d'un ticket. Le ticket lui-même est conservé.
pub async fn clear_messages<C: ConnectionTrait>(connector: &C, ticket_id: TicketId) -> Result<u64> {
    let res = model::TicketMessage::delete_many()
        .filter(message::Column::TicketId.eq(ticket_id))
        .exec(connector).await?;
    log_info!("{} messages removed from ticket {}", res.rows_affected, ticket_id);
    Ok(res.rows_affected)
}

/// Supprime définitivement un ticket et ses messages.
pub async fn delete_ticket<C: ConnectionTrait + TransactionTrait>(db: &C, ticket_id: TicketId) -> Result<bool> {
    let txn = db.begin().await?;
    model::TicketMessage::delete_many()
        .filter(message::Column::TicketId.eq(ticket_id))
        .exec(&txn).await?;
    let res = model::Ticket::delete_by_id(ticket_id).exec(&txn).await?;
    txn.commit().await?;
    if res.rows_affected > 0 {
        log_info!("Ticket {} deleted", ticket_id);
    }
    Ok(res.rows_affected > 0)
}

pub async fn stats<C: ConnectionTrait>(connector: &C) -> Result<TicketStats> {
    let by_status = model::Ticket::find()
        .select_only()
        .column(ticket::Column::Status)
        .column_as(Expr::col(ticket::Column::Id).count(), "count")
        .group_by(ticket::Column::Status)
        .into_model::<StatusCount>()
        .all(connector).await?;
    let by_priority = model::Ticket::find()
        .select_only()
        .column(ticket::Column::Priority)
        .column_as(Expr::col(ticket::Column::Id).count(), "count")
        .group_by(ticket::Column::Priority)
        .into_model::<PriorityCount>()
        .all(connector).await?;
    let average = model::Ticket::find()
        .select_only()
        .column_as(SimpleExpr::from(Func::avg(Expr::col(ticket::Column::Rating))), "average")
        .filter(ticket::Column::Rating.is_not_null())
        .into_model::<AverageRating>()
        .one(connector).await?
        .and_then(|a| a.average);

    let mut by_status = by_status.into_iter()
        .map(|row| (row.status, row.count.max(0) as u64))
        .collect::<Vec<_>>();
    by_status.sort_by_key(|(status, _)| *status as u8);
    let mut by_priority = by_priority.into_iter()
        .map(|row| (row.priority, row.count.max(0) as u64))
        .collect::<Vec<_>>();
    by_priority.sort_by_key(|(priority, _)| *priority);
    Ok(TicketStats {
        total: by_status.iter().map(|(_, count)| count).sum(),
        by_status,
        by_priority,
        average_rating: average,
    })
}
