use crate::db::{IDType, controller, model::ticket::TicketStatus};
use crate::notify::{render::status_label, DeliveryError};
use super::wizard::WizardError;

/// Erreurs rapportées à l'acteur. Le message affiché est celui de `Display`.
#[derive(Debug, thiserror::Error)]
pub enum TicketError {
    #[error("Ticket {0} introuvable.")]
    NotFound(String),
    #[error("Administrateur {0} introuvable.")]
    AdminNotFound(IDType),
    #[error("Impossible de {action} le ticket {number} : il est {}.", label(.status))]
    InvalidState {
        number: String,
        status: TicketStatus,
        action: &'static str,
    },
    #[error("Action réservée {0}.")]
    Unauthorized(&'static str),
    #[error("{0}")]
    Validation(String),
    #[error("Erreur interne, réessayez plus tard.")]
    Store(#[from] controller::Error),
    #[error("Message impossible à envoyer, réessayez plus tard.")]
    Delivery(#[from] DeliveryError),
}

impl From<sea_orm::DbErr> for TicketError {
    fn from(e: sea_orm::DbErr) -> Self {
        TicketError::Store(controller::Error::SeaORM(e))
    }
}

impl From<WizardError> for TicketError {
    fn from(e: WizardError) -> Self {
        TicketError::Validation(e.to_string())
    }
}

impl TicketError {
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        TicketError::Validation(msg.into())
    }
}

fn label(status: &TicketStatus) -> &'static str {
    status_label(*status)
}

pub type Result<T> = std::result::Result<T, TicketError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_failure_is_not_a_validation_error() {
        let e = TicketError::from(DeliveryError::Transport("connection reset".to_string()));
        assert!(matches!(e, TicketError::Delivery(_)));
        assert_eq!(e.to_string(), "Message impossible à envoyer, réessayez plus tard.");
        assert!(!e.to_string().contains("connection reset"));
    }
}
