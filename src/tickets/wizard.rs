//! Assistant de création de ticket en plusieurs étapes.
//!
//! Une session par utilisateur : catégorie, priorité, description puis
//! confirmation. Annuler revient à jeter la session.

use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::db::{IDType, model::ticket::{TicketCategory, TicketPriority}};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Category,
    Priority,
    Description,
    Confirm,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WizardError {
    #[error("Aucune création de ticket en cours. Utilisez `new` pour commencer.")]
    NoSession,
    #[error("Étape incorrecte, le ticket attend : {}", .0.hint())]
    WrongStep(Step),
    #[error("La description ne peut pas être vide.")]
    EmptyDescription,
}

impl Step {
    pub fn hint(&self) -> &'static str {
        match self {
            Step::Category => "une catégorie (network, software, hardware, access, other)",
            Step::Priority => "une priorité (low, medium, high)",
            Step::Description => "une description du problème",
            Step::Confirm => "une confirmation (confirm) ou une annulation (cancel)",
        }
    }
}

/// Ticket en cours de saisie
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreationSession {
    pub category: Option<TicketCategory>,
    pub priority: Option<TicketPriority>,
    pub description: Option<String>,
    pub attachment: Option<String>,
}

/// Ticket prêt à être créé
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub category: TicketCategory,
    pub priority: TicketPriority,
    pub description: String,
    pub attachment: Option<String>,
}

impl CreationSession {
    pub fn step(&self) -> Step {
        match (self.category, self.priority, &self.description) {
            (None, _, _) => Step::Category,
            (Some(_), None, _) => Step::Priority,
            (Some(_), Some(_), None) => Step::Description,
            _ => Step::Confirm,
        }
    }
    fn draft(&self) -> Option<Draft> {
        Some(Draft {
            category: self.category?,
            priority: self.priority?,
            description: self.description.clone()?,
            attachment: self.attachment.clone(),
        })
    }
}

#[derive(Default)]
pub struct Wizard {
    sessions: Mutex<HashMap<IDType, CreationSession>>,
}

impl Wizard {
    pub fn new() -> Self {
        Self::default()
    }
    /// Démarre une session, en remplaçant celle en cours s'il y en a une.
    pub async fn start(&self, actor: IDType) -> Step {
        self.sessions.lock().await.insert(actor, CreationSession::default());
        Step::Category
    }
    pub async fn step(&self, actor: IDType) -> Option<Step> {
        self.sessions.lock().await.get(&actor).map(CreationSession::step)
    }
    /// La catégorie peut être changée tant que la session existe.
    pub async fn set_category(&self, actor: IDType, category: TicketCategory) -> Result<Step, WizardError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(&actor).ok_or(WizardError::NoSession)?;
        session.category = Some(category);
        Ok(session.step())
    }
    pub async fn set_priority(&self, actor: IDType, priority: TicketPriority) -> Result<Step, WizardError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(&actor).ok_or(WizardError::NoSession)?;
        if session.category.is_none() {
            return Err(WizardError::WrongStep(Step::Category));
        }
        session.priority = Some(priority);
        Ok(session.step())
    }
    pub async fn set_description(&self, actor: IDType, text: &str, attachment: Option<String>) -> Result<Step, WizardError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(&actor).ok_or(WizardError::NoSession)?;
        match session.step() {
            Step::Description | Step::Confirm => (),
            step => return Err(WizardError::WrongStep(step)),
        }
        let text = text.trim();
        if text.is_empty() && attachment.is_none() {
            return Err(WizardError::EmptyDescription);
        }
        session.description = Some(text.to_string());
        session.attachment = attachment;
        Ok(session.step())
    }
    /// Retire la session si elle est complète.
    pub async fn confirm(&self, actor: IDType) -> Result<Draft, WizardError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get(&actor).ok_or(WizardError::NoSession)?;
        let draft = session.draft().ok_or(WizardError::WrongStep(session.step()))?;
        sessions.remove(&actor);
        Ok(draft)
    }
    pub async fn cancel(&self, actor: IDType) -> bool {
        self.sessions.lock().await.remove(&actor).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn steps_follow_in_order() {
        let wizard = Wizard::new();
        assert_eq!(wizard.start(5).await, Step::Category);
        assert_eq!(wizard.set_priority(5, TicketPriority::High).await, Err(WizardError::WrongStep(Step::Category)));
        assert_eq!(wizard.set_category(5, TicketCategory::Network).await, Ok(Step::Priority));
        assert_eq!(wizard.set_description(5, "VPN down", None).await, Err(WizardError::WrongStep(Step::Priority)));
        assert_eq!(wizard.set_priority(5, TicketPriority::High).await, Ok(Step::Description));
        assert_eq!(wizard.set_description(5, "   ", None).await, Err(WizardError::EmptyDescription));
        assert_eq!(wizard.set_description(5, " VPN down ", None).await, Ok(Step::Confirm));
        let draft = wizard.confirm(5).await.unwrap();
        assert_eq!(draft.category, TicketCategory::Network);
        assert_eq!(draft.priority, TicketPriority::High);
        assert_eq!(draft.description, "VPN down");
        assert_eq!(wizard.step(5).await, None);
    }

    #[tokio::test]
    async fn incomplete_session_cannot_be_confirmed() {
        let wizard = Wizard::new();
        wizard.start(1).await;
        wizard.set_category(1, TicketCategory::Other).await.unwrap();
        assert_eq!(wizard.confirm(1).await, Err(WizardError::WrongStep(Step::Priority)));
        assert_eq!(wizard.step(1).await, Some(Step::Priority));
    }

    #[tokio::test]
    async fn cancel_discards_session() {
        let wizard = Wizard::new();
        wizard.start(1).await;
        assert!(wizard.cancel(1).await);
        assert!(!wizard.cancel(1).await);
        assert_eq!(wizard.set_category(1, TicketCategory::Access).await, Err(WizardError::NoSession));
    }

    #[tokio::test]
    async fn sessions_are_per_actor() {
        let wizard = Wizard::new();
        wizard.start(1).await;
        wizard.start(2).await;
        wizard.set_category(1, TicketCategory::Hardware).await.unwrap();
        assert_eq!(wizard.step(1).await, Some(Step::Priority));
        assert_eq!(wizard.step(2).await, Some(Step::Category));
    }
}
