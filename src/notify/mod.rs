//! Diffusion des événements du cycle de vie des tickets.
//!
//! L'envoi est fait au mieux : une seule tentative, pas de relance. Un échec
//! est retourné à l'appelant qui le journalise, l'état du ticket est déjà
//! enregistré et n'est jamais annulé.

pub mod render;
pub mod discord;

use std::{fmt, sync::Arc};
use serenity::async_trait;

use crate::db::{
    IDType,
    model::ticket::{self, message::SenderRole, TicketCategory, TicketId, TicketPriority, TicketStatus},
};
use crate::log_warn;

/// Destinataire d'une notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    User(IDType),
    Admin(IDType),
    /// Salon partagé des administrateurs
    SharedChannel,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::User(id) => write!(f, "user {}", id),
            Target::Admin(id) => write!(f, "admin {}", id),
            Target::SharedChannel => write!(f, "admin channel"),
        }
    }
}

/// État d'un ticket au moment de l'événement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketSummary {
    pub id: TicketId,
    pub number: String,
    pub user_id: IDType,
    pub admin_id: Option<IDType>,
    pub status: TicketStatus,
    pub category: TicketCategory,
    pub priority: TicketPriority,
    pub description: String,
}

impl From<&ticket::Model> for TicketSummary {
    fn from(ticket: &ticket::Model) -> Self {
        Self {
            id: ticket.id,
            number: ticket.ticket_number.clone(),
            user_id: ticket.user_id,
            admin_id: ticket.admin_id,
            status: ticket.status,
            category: ticket.category,
            priority: ticket.priority,
            description: ticket.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Created { ticket: TicketSummary, owner: String },
    Claimed { ticket: TicketSummary, admin: String },
    OnHold { ticket: TicketSummary },
    Resumed { ticket: TicketSummary },
    Closed { ticket: TicketSummary },
    Transferred { ticket: TicketSummary, by: String },
    ReplyReceived {
        ticket: TicketSummary,
        from: SenderRole,
        sender: String,
        text: Option<String>,
        attachment: Option<String>,
    },
    ReminderUnclaimed { ticket: TicketSummary },
    ReminderOnHold { ticket: TicketSummary },
    ReminderInProgress { ticket: TicketSummary },
}

impl Event {
    pub fn ticket(&self) -> &TicketSummary {
        match self {
            Event::Created { ticket, .. }
            | Event::Claimed { ticket, .. }
            | Event::OnHold { ticket }
            | Event::Resumed { ticket }
            | Event::Closed { ticket }
            | Event::Transferred { ticket, .. }
            | Event::ReplyReceived { ticket, .. }
            | Event::ReminderUnclaimed { ticket }
            | Event::ReminderOnHold { ticket }
            | Event::ReminderInProgress { ticket } => ticket,
        }
    }
    pub fn name(&self) -> &'static str {
        match self {
            Event::Created { .. } => "ticket_created",
            Event::Claimed { .. } => "ticket_claimed",
            Event::OnHold { .. } => "ticket_on_hold",
            Event::Resumed { .. } => "ticket_resumed",
            Event::Closed { .. } => "ticket_closed",
            Event::Transferred { .. } => "ticket_transferred",
            Event::ReplyReceived { .. } => "reply_received",
            Event::ReminderUnclaimed { .. } => "reminder_unclaimed",
            Event::ReminderOnHold { .. } => "reminder_on_hold",
            Event::ReminderInProgress { .. } => "reminder_in_progress",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("{0} is unreachable")]
    Unreachable(Target),
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<serenity::Error> for DeliveryError {
    fn from(e: serenity::Error) -> Self {
        DeliveryError::Transport(e.to_string())
    }
}

/// Transport des notifications.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Délivre un événement. Retourne l'identifiant du message posté quand
    /// la cible est le salon partagé.
    async fn deliver(&self, target: Target, event: &Event) -> Result<Option<IDType>, DeliveryError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivered {
    pub target: Target,
    pub message_id: Option<IDType>,
}

#[derive(Clone)]
pub struct Dispatcher {
    sink: Arc<dyn NotificationSink>,
}

impl Dispatcher {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }
    /// Une seule tentative d'envoi.
    pub async fn notify(&self, target: Target, event: &Event) -> Result<Delivered, DeliveryError> {
        let message_id = self.sink.deliver(target, event).await?;
        Ok(Delivered { target, message_id })
    }
    /// Comme [`Dispatcher::notify`], l'échec est journalisé et oublié.
    pub async fn notify_logged(&self, target: Target, event: &Event) -> Option<Delivered> {
        match self.notify(target, event).await {
            Ok(delivered) => Some(delivered),
            Err(e) => {
                log_warn!("{} for {} not delivered to {}: {}", event.name(), event.ticket().number, target, e);
                None
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Transport factice enregistrant les envois.
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
    use tokio::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingSink {
        pub sent: Mutex<Vec<(Target, Event)>>,
        failing: AtomicBool,
        next_message_id: AtomicI64,
    }

    impl RecordingSink {
        pub fn new() -> Arc<Self> {
            Arc::new(Self {
                next_message_id: AtomicI64::new(1000),
                ..Default::default()
            })
        }
        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }
        pub async fn take(&self) -> Vec<(Target, Event)> {
            std::mem::take(&mut *self.sent.lock().await)
        }
        /// Noms des événements envoyés à `target`
        pub async fn names_for(&self, target: Target) -> Vec<&'static str> {
            self.sent.lock().await.iter()
                .filter(|(t, _)| *t == target)
                .map(|(_, e)| e.name())
                .collect()
        }
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn deliver(&self, target: Target, event: &Event) -> Result<Option<IDType>, DeliveryError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(DeliveryError::Unreachable(target));
            }
            self.sent.lock().await.push((target, event.clone()));
            match target {
                Target::SharedChannel => Ok(Some(self.next_message_id.fetch_add(1, Ordering::SeqCst))),
                _ => Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{*, testing::RecordingSink};

    fn summary() -> TicketSummary {
        TicketSummary {
            id: 1,
            number: "#00001".to_string(),
            user_id: 10,
            admin_id: None,
            status: TicketStatus::New,
            category: TicketCategory::Network,
            priority: TicketPriority::High,
            description: "VPN down".to_string(),
        }
    }

    #[tokio::test]
    async fn delivery_failure_is_returned() {
        let sink = RecordingSink::new();
        let dispatcher = Dispatcher::new(sink.clone());
        let event = Event::Closed { ticket: summary() };
        sink.set_failing(true);
        assert_eq!(dispatcher.notify(Target::User(10), &event).await, Err(DeliveryError::Unreachable(Target::User(10))));
        assert_eq!(dispatcher.notify_logged(Target::User(10), &event).await, None);
        sink.set_failing(false);
        let delivered = dispatcher.notify(Target::SharedChannel, &event).await.unwrap();
        assert_eq!(delivered.message_id, Some(1000));
        assert_eq!(sink.take().await.len(), 1);
    }
}
