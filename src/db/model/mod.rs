//! Entités de la base de données.

pub mod user;
pub mod admin;
pub mod ticket;
pub mod sequence;

pub use user::Entity as User;
pub use admin::Entity as Admin;
pub use ticket::{Ticket, TicketMessage};
pub use sequence::Entity as Sequence;
