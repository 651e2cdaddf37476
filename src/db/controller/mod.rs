//! Opérations sur la base de données.
//!
//! Chaque opération composée de plusieurs écritures passe par une transaction
//! ou par une mise à jour conditionnelle unique.

pub mod ticket;
pub mod user;
pub mod admin;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("database error: {0}")]
    SeaORM(#[from] sea_orm::DbErr),
    #[error("sequence {0} is missing")]
    MissingSequence(&'static str),
    #[error("{0} not found after insert")]
    NotFoundAfterInsert(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
