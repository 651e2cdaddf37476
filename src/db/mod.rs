//! Stockage des tickets.
//!
//! Les entités sont décrites dans [`model`], les opérations transactionnelles
//! dans [`controller`].

pub mod model;
pub mod controller;

use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DbConn, DbErr, EntityTrait, QueryOrder, Schema, TransactionTrait,
    sea_query::Index,
};
use std::path::Path;
use crate::log_info;

/// Identifiant des acteurs (utilisateurs et administrateurs)
pub type IDType = i64;

/// Nom de la séquence utilisée pour numéroter les tickets
pub const TICKET_SEQUENCE: &str = "ticket";

/// Dossier du fichier SQLite désigné par `url`, s'il y en a un.
fn sqlite_dir(url: &str) -> Option<&Path> {
    let path = url.strip_prefix("sqlite://")?;
    let path = path.split('?').next()?;
    Path::new(path).parent().filter(|p| !p.as_os_str().is_empty())
}

pub async fn start_db(url: &str) -> Result<DbConn, DbErr> {
    if let Some(dir) = sqlite_dir(url) {
        std::fs::create_dir_all(dir)
            .map_err(|e| DbErr::Custom(format!("Unable to create {}: {}", dir.to_string_lossy(), e)))?;
    }
    let mut options = ConnectOptions::new(url.to_string());
    options.sqlx_logging(false);
    if url.contains(":memory:") {
        // Chaque connexion ouvrirait sa propre base en mémoire
        options.max_connections(1).min_connections(1);
    }
    let db = Database::connect(options).await?;
    check_tables(&db).await?;
    seed_sequence(&db).await?;
    Ok(db)
}

async fn check_tables(db: &DbConn) -> Result<(), DbErr> {
    use model::ticket;
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);
    let transaction = db.begin().await?;

    transaction.execute(builder.build(schema.create_table_from_entity(model::User).if_not_exists())).await?;
    transaction.execute(builder.build(schema.create_table_from_entity(model::Admin).if_not_exists())).await?;
    transaction.execute(builder.build(schema.create_table_from_entity(model::Ticket).if_not_exists())).await?;
    transaction.execute(builder.build(schema.create_table_from_entity(model::TicketMessage).if_not_exists())).await?;
    transaction.execute(builder.build(schema.create_table_from_entity(model::Sequence).if_not_exists())).await?;

    let indices = [
        ("idx_ticket_status", ticket::Column::Status),
        ("idx_ticket_admin_id", ticket::Column::AdminId),
        ("idx_ticket_user_id", ticket::Column::UserId),
    ];
    for (name, column) in indices {
        let index = Index::create()
            .name(name)
            .table(model::Ticket)
            .col(column)
            .if_not_exists()
            .to_owned();
        transaction.execute(builder.build(&index)).await?;
    }
    let index = Index::create()
        .name("idx_ticket_message_ticket_id")
        .table(model::TicketMessage)
        .col(ticket::message::Column::TicketId)
        .if_not_exists()
        .to_owned();
    transaction.execute(builder.build(&index)).await?;
    transaction.commit().await?;

    Ok(())
}

/// Crée la séquence des numéros de ticket si elle n'existe pas.
///
/// La valeur de départ reprend le plus grand identifiant existant pour ne
/// jamais réattribuer un numéro.
async fn seed_sequence(db: &DbConn) -> Result<(), DbErr> {
    use model::{sequence, ticket};
    use sea_orm::ActiveValue::Set;
    if model::Sequence::find_by_id(TICKET_SEQUENCE.to_string()).one(db).await?.is_some() {
        return Ok(());
    }
    let start = model::Ticket::find()
        .order_by_desc(ticket::Column::Id)
        .one(db).await?
        .map(|t| t.id as i64)
        .unwrap_or(0);
    model::Sequence::insert(sequence::ActiveModel {
        name: Set(TICKET_SEQUENCE.to_string()),
        value: Set(start),
    }).exec(db).await?;
    log_info!("Ticket sequence initialized at {}", start);
    Ok(())
}

#[cfg(test)]
pub(crate) async fn memory_db() -> DbConn {
    start_db("sqlite::memory:").await.expect("in-memory database")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_directory() {
        assert_eq!(sqlite_dir("sqlite://data/helpdesk.db?mode=rwc"), Some(Path::new("data")));
        assert_eq!(sqlite_dir("sqlite://helpdesk.db"), None);
        assert_eq!(sqlite_dir("sqlite::memory:"), None);
    }

    #[tokio::test]
    async fn sequence_is_seeded_once() {
        let db = memory_db().await;
        seed_sequence(&db).await.unwrap();
        let sequences = model::Sequence::find().all(&db).await.unwrap();
        assert_eq!(sequences.len(), 1);
        assert_eq!(sequences[0].value, 0);
    }
}
