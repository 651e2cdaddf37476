//! Cycle de vie des tickets.
//!
//! [`TicketEngine`] reçoit les actions des acteurs, vérifie leurs droits,
//! applique la transition dans la base puis prévient les personnes
//! concernées. Un échec d'envoi n'annule jamais une transition.

pub mod number;
pub mod status;
pub mod prompt;
pub mod wizard;
mod error;

pub use error::{Result, TicketError};

use std::{fmt, str::FromStr, sync::Arc};
use sea_orm::DatabaseConnection;

use crate::access::AccessGuard;
use crate::config::TicketPolicy;
use crate::db::{
    IDType,
    controller::{self, admin::{AddAdmin, RemoveAdmin}, ticket::{NewTicket, TicketChanges, TicketFilter, TicketStats}},
    model::{admin, ticket::{self, message::{self, SenderRole}, TicketCategory, TicketId, TicketPriority, TicketStatus}},
};
use crate::notify::{Dispatcher, Event, Target, TicketSummary};
use crate::{log_debug, log_error, log_info};
use prompt::{Prompt, PromptKind, PromptTable};
use status::Action;
use wizard::{Step, Wizard};

/// Nombre de tickets affichés par `mine`
const MINE_LIMIT: u64 = 10;

/// Personne à l'origine d'une action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: IDType,
    pub name: String,
    pub handle: Option<String>,
}

impl Actor {
    pub fn new<S: Into<String>>(id: IDType, name: S) -> Self {
        Self { id, name: name.into(), handle: None }
    }
    pub fn with_handle<S: Into<String>>(mut self, handle: S) -> Self {
        self.handle = Some(handle.into());
        self
    }
    pub fn display_name(&self) -> String {
        match &self.handle {
            Some(handle) => format!("@{}", handle),
            None => self.name.clone(),
        }
    }
}

/// Référence vers un ticket : identifiant interne ou numéro saisi
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketRef {
    Id(TicketId),
    Number(String),
}

impl TicketRef {
    pub fn number<S: AsRef<str>>(reference: S) -> Self {
        TicketRef::Number(number::normalize(reference.as_ref()))
    }
}

impl fmt::Display for TicketRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TicketRef::Id(id) => write!(f, "n°{}", id),
            TicketRef::Number(number) => f.write_str(number),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFilter {
    /// Derniers tickets de l'acteur
    Mine,
    /// Tickets ouverts assignés à l'administrateur
    Assigned,
    AllOpen,
    ByUser(IDType),
}

/// Issue d'une réponse libre dans le salon des administrateurs
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelReply {
    Replied(ticket::Model),
    DescriptionUpdated(ticket::Model),
    /// Description vide, l'invite attend toujours une réponse
    PromptRearmed(TicketId),
    /// Aucun ticket ne correspond
    Dropped,
}

pub struct TicketEngine {
    db: Arc<DatabaseConnection>,
    guard: AccessGuard,
    dispatcher: Dispatcher,
    prompts: PromptTable,
    wizard: Wizard,
    policy: TicketPolicy,
}

fn parse_field<T: FromStr<Err = ticket::UnknownVariant>>(value: &str) -> Result<T> {
    value.parse::<T>().map_err(|e| TicketError::validation(e.to_string()))
}

fn non_empty(text: &str, attachment: &Option<String>, what: &str) -> Result<Option<String>> {
    let text = text.trim();
    match (text.is_empty(), attachment.is_some()) {
        (true, false) => Err(TicketError::validation(format!("{} ne peut pas être vide.", what))),
        (true, true) => Ok(None),
        (false, _) => Ok(Some(text.to_string())),
    }
}

impl TicketEngine {
    pub fn new(db: Arc<DatabaseConnection>, guard: AccessGuard, dispatcher: Dispatcher, prompts: PromptTable, policy: TicketPolicy) -> Self {
        Self {
            db,
            guard,
            dispatcher,
            prompts,
            wizard: Wizard::new(),
            policy,
        }
    }
    pub fn guard(&self) -> &AccessGuard {
        &self.guard
    }

    async fn fetch(&self, reference: &TicketRef) -> Result<ticket::Model> {
        let found = match reference {
            TicketRef::Id(id) => controller::ticket::find_ticket(&*self.db, *id).await?,
            TicketRef::Number(n) => controller::ticket::find_ticket_by_number(&*self.db, &number::normalize(n)).await?,
        };
        found.ok_or_else(|| TicketError::NotFound(reference.to_string()))
    }

    /// Enregistre ou met à jour l'acteur comme utilisateur.
    pub async fn register(&self, actor: &Actor) -> Result<()> {
        controller::user::upsert_user(&*self.db, actor.id, &actor.name, actor.handle.as_deref()).await?;
        Ok(())
    }

    /// Poste un ticket dans le salon partagé et mémorise le message.
    async fn broadcast(&self, ticket: ticket::Model, event: Event) -> ticket::Model {
        let delivered = self.dispatcher.notify_logged(Target::SharedChannel, &event).await;
        let message_id = match delivered.and_then(|d| d.message_id) {
            Some(message_id) => message_id,
            None => return ticket,
        };
        let changes = TicketChanges { message_id: Some(message_id), ..Default::default() };
        match controller::ticket::update_ticket(&*self.db, ticket.id, changes).await {
            Ok(Some(updated)) => updated,
            Ok(None) => ticket,
            Err(e) => {
                log_error!("Unable to store the admin message of ticket {}: {}", ticket.ticket_number, e);
                ticket
            }
        }
    }

    pub async fn create(
        &self,
        actor: &Actor,
        category: TicketCategory,
        priority: TicketPriority,
        description: &str,
        attachment: Option<String>,
    ) -> Result<ticket::Model> {
        let description = non_empty(description, &attachment, "La description")?.unwrap_or_default();
        self.register(actor).await?;
        let created = controller::ticket::create_ticket(&*self.db, NewTicket {
            user_id: actor.id,
            category,
            priority,
            description,
            attachment,
        }).await?;
        let event = Event::Created { ticket: TicketSummary::from(&created), owner: actor.display_name() };
        Ok(self.broadcast(created, event).await)
    }

    /// Création en une commande, catégorie `other` et priorité `medium`.
    pub async fn quick_create(&self, actor: &Actor, description: &str, attachment: Option<String>) -> Result<ticket::Model> {
        self.create(actor, TicketCategory::Other, TicketPriority::Medium, description, attachment).await
    }

    pub async fn start_wizard(&self, actor: &Actor) -> Result<Step> {
        self.register(actor).await?;
        Ok(self.wizard.start(actor.id).await)
    }
    pub async fn wizard_step(&self, actor: &Actor) -> Option<Step> {
        self.wizard.step(actor.id).await
    }
    pub async fn wizard_category(&self, actor: &Actor, category: &str) -> Result<Step> {
        let category = parse_field::<TicketCategory>(category)?;
        Ok(self.wizard.set_category(actor.id, category).await?)
    }
    pub async fn wizard_priority(&self, actor: &Actor, priority: &str) -> Result<Step> {
        let priority = parse_field::<TicketPriority>(priority)?;
        Ok(self.wizard.set_priority(actor.id, priority).await?)
    }
    pub async fn wizard_description(&self, actor: &Actor, text: &str, attachment: Option<String>) -> Result<Step> {
        Ok(self.wizard.set_description(actor.id, text, attachment).await?)
    }
    pub async fn confirm_wizard(&self, actor: &Actor) -> Result<ticket::Model> {
        let draft = self.wizard.confirm(actor.id).await?;
        self.create(actor, draft.category, draft.priority, &draft.description, draft.attachment).await
    }
    /// Abandonne la saisie en cours de l'acteur : assistant et invites.
    ///
    /// Retourne vrai si quelque chose a été annulé.
    pub async fn cancel(&self, actor: &Actor) -> bool {
        let session = self.wizard.cancel(actor.id).await;
        let prompts = self.prompts.cancel_for(actor.id).await;
        session || prompts > 0
    }

    /// Vérifie la règle d'attribution pour les actions réservées à l'assigné.
    fn check_assignee(&self, actor: &Actor, ticket: &ticket::Model) -> Result<()> {
        match ticket.admin_id {
            Some(admin_id) if self.policy.assignee_only && admin_id != actor.id && !self.guard.is_senior(actor.id) => {
                Err(TicketError::Unauthorized("à l'administrateur assigné"))
            }
            _ => Ok(()),
        }
    }

    async fn apply(&self, actor: &Actor, reference: &TicketRef, action: Action) -> Result<ticket::Model> {
        self.guard.require_admin(actor.id).await?;
        let current = self.fetch(reference).await?;
        if let Action::Hold | Action::Resume = action {
            self.check_assignee(actor, &current)?;
        }
        let invalid = |ticket: &ticket::Model| TicketError::InvalidState {
            number: ticket.ticket_number.clone(),
            status: ticket.status,
            action: action.verb(),
        };
        if current.status.apply(action).is_none() {
            return Err(invalid(&current));
        }
        let updated = controller::ticket::transition(
            &*self.db,
            current.id,
            action.allowed_from(),
            action.target(),
            action.assignment(actor.id),
        ).await?;
        let updated = match updated {
            Some(updated) => updated,
            None => {
                // Un autre acteur est passé entre la lecture et la mise à jour
                let now = self.fetch(&TicketRef::Id(current.id)).await?;
                return Err(invalid(&now));
            }
        };
        log_info!("{} ({}) applied {:?} on ticket {}", actor.display_name(), actor.id, action, updated.ticket_number);

        let summary = TicketSummary::from(&updated);
        let owner = Target::User(updated.user_id);
        let updated = match action {
            Action::Claim => {
                self.dispatcher.notify_logged(owner, &Event::Claimed { ticket: summary, admin: actor.display_name() }).await;
                updated
            }
            Action::Hold => {
                self.dispatcher.notify_logged(owner, &Event::OnHold { ticket: summary }).await;
                updated
            }
            Action::Resume => {
                self.dispatcher.notify_logged(owner, &Event::Resumed { ticket: summary }).await;
                updated
            }
            Action::Close => {
                self.dispatcher.notify_logged(owner, &Event::Closed { ticket: summary }).await;
                updated
            }
            Action::Transfer => {
                let event = Event::Transferred { ticket: summary, by: actor.display_name() };
                self.dispatcher.notify_logged(owner, &event).await;
                self.broadcast(updated, event).await
            }
        };
        Ok(updated)
    }

    pub async fn claim(&self, actor: &Actor, reference: &TicketRef) -> Result<ticket::Model> {
        self.apply(actor, reference, Action::Claim).await
    }
    pub async fn hold(&self, actor: &Actor, reference: &TicketRef) -> Result<ticket::Model> {
        self.apply(actor, reference, Action::Hold).await
    }
    pub async fn resume(&self, actor: &Actor, reference: &TicketRef) -> Result<ticket::Model> {
        self.apply(actor, reference, Action::Resume).await
    }
    pub async fn close(&self, actor: &Actor, reference: &TicketRef) -> Result<ticket::Model> {
        self.apply(actor, reference, Action::Close).await
    }
    pub async fn transfer(&self, actor: &Actor, reference: &TicketRef) -> Result<ticket::Model> {
        self.apply(actor, reference, Action::Transfer).await
    }

    async fn edit(&self, actor: &Actor, reference: &TicketRef, changes: TicketChanges) -> Result<ticket::Model> {
        self.guard.require_admin(actor.id).await?;
        let ticket = self.fetch(reference).await?;
        let updated = controller::ticket::update_ticket(&*self.db, ticket.id, changes).await?
            .ok_or_else(|| TicketError::NotFound(reference.to_string()))?;
        log_info!("{} ({}) edited ticket {}", actor.display_name(), actor.id, updated.ticket_number);
        Ok(updated)
    }
    pub async fn edit_category(&self, actor: &Actor, reference: &TicketRef, category: &str) -> Result<ticket::Model> {
        let category = parse_field::<TicketCategory>(category)?;
        self.edit(actor, reference, TicketChanges { category: Some(category), ..Default::default() }).await
    }
    pub async fn edit_priority(&self, actor: &Actor, reference: &TicketRef, priority: &str) -> Result<ticket::Model> {
        let priority = parse_field::<TicketPriority>(priority)?;
        self.edit(actor, reference, TicketChanges { priority: Some(priority), ..Default::default() }).await
    }
    pub async fn edit_description(&self, actor: &Actor, reference: &TicketRef, description: &str) -> Result<ticket::Model> {
        let description = non_empty(description, &None, "La description")?.unwrap_or_default();
        self.edit(actor, reference, TicketChanges { description: Some(description), ..Default::default() }).await
    }

    /// Efface les messages du ticket, qui lui est conservé.
    pub async fn clear_history(&self, actor: &Actor, reference: &TicketRef) -> Result<u64> {
        self.guard.require_admin(actor.id).await?;
        let ticket = self.fetch(reference).await?;
        Ok(controller::ticket::clear_messages(&*self.db, ticket.id).await?)
    }

    /// Supprime le ticket et ses messages. Retourne le numéro supprimé.
    pub async fn delete(&self, actor: &Actor, reference: &TicketRef) -> Result<String> {
        self.guard.require_admin(actor.id).await?;
        let ticket = self.fetch(reference).await?;
        if !controller::ticket::delete_ticket(&*self.db, ticket.id).await? {
            return Err(TicketError::NotFound(reference.to_string()));
        }
        log_info!("{} ({}) deleted ticket {}", actor.display_name(), actor.id, ticket.ticket_number);
        Ok(ticket.ticket_number)
    }

    fn ensure_open(ticket: &ticket::Model, action: &'static str) -> Result<()> {
        match ticket.is_closed() {
            true => Err(TicketError::InvalidState {
                number: ticket.ticket_number.clone(),
                status: ticket.status,
                action,
            }),
            false => Ok(()),
        }
    }

    pub async fn admin_reply(&self, actor: &Actor, reference: &TicketRef, text: &str, attachment: Option<String>) -> Result<ticket::Model> {
        self.guard.require_admin(actor.id).await?;
        let ticket = self.fetch(reference).await?;
        Self::ensure_open(&ticket, "répondre sur")?;
        self.check_assignee(actor, &ticket)?;
        let text = non_empty(text, &attachment, "La réponse")?;
        controller::ticket::append_message(&*self.db, ticket.id, actor.id, SenderRole::Admin, text.clone(), attachment.clone()).await?;
        let event = Event::ReplyReceived {
            ticket: TicketSummary::from(&ticket),
            from: SenderRole::Admin,
            sender: actor.display_name(),
            text,
            attachment,
        };
        self.dispatcher.notify_logged(Target::User(ticket.user_id), &event).await;
        Ok(ticket)
    }

    /// Réponse du demandeur, transmise à l'administrateur assigné ou au
    /// salon partagé.
    pub async fn user_reply(&self, actor: &Actor, reference: &TicketRef, text: &str, attachment: Option<String>) -> Result<ticket::Model> {
        self.register(actor).await?;
        let ticket = self.fetch(reference).await?;
        if ticket.user_id != actor.id {
            return Err(TicketError::Unauthorized("au demandeur du ticket"));
        }
        Self::ensure_open(&ticket, "répondre sur")?;
        let text = non_empty(text, &attachment, "La réponse")?;
        controller::ticket::append_message(&*self.db, ticket.id, actor.id, SenderRole::User, text.clone(), attachment.clone()).await?;
        let event = Event::ReplyReceived {
            ticket: TicketSummary::from(&ticket),
            from: SenderRole::User,
            sender: actor.display_name(),
            text,
            attachment,
        };
        let target = match ticket.admin_id {
            Some(admin_id) => Target::Admin(admin_id),
            None => Target::SharedChannel,
        };
        self.dispatcher.notify_logged(target, &event).await;
        Ok(ticket)
    }

    /// Enregistre l'invite `anchor` postée pour répondre au ticket.
    pub async fn open_reply_prompt(&self, actor: &Actor, reference: &TicketRef, anchor: IDType) -> Result<ticket::Model> {
        self.guard.require_admin(actor.id).await?;
        let ticket = self.fetch(reference).await?;
        Self::ensure_open(&ticket, "répondre sur")?;
        self.check_assignee(actor, &ticket)?;
        self.prompts.open(anchor, Prompt { kind: PromptKind::Reply, ticket_id: ticket.id, opened_by: actor.id }).await;
        Ok(ticket)
    }
    pub async fn open_edit_prompt(&self, actor: &Actor, reference: &TicketRef, anchor: IDType) -> Result<ticket::Model> {
        self.guard.require_admin(actor.id).await?;
        let ticket = self.fetch(reference).await?;
        self.prompts.open(anchor, Prompt { kind: PromptKind::EditDescription, ticket_id: ticket.id, opened_by: actor.id }).await;
        Ok(ticket)
    }

    /// Rattache une réponse libre du salon des administrateurs à un ticket.
    ///
    /// L'invite en attente est consultée d'abord, puis le message du ticket
    /// dans le salon. Sans correspondance la réponse est ignorée.
    pub async fn resolve_channel_reply(&self, actor: &Actor, anchor: IDType, text: &str, attachment: Option<String>) -> Result<ChannelReply> {
        self.guard.require_admin(actor.id).await?;
        match self.prompts.take(anchor).await {
            Some(prompt @ Prompt { kind: PromptKind::EditDescription, .. }) => {
                if text.trim().is_empty() {
                    self.prompts.open(anchor, prompt).await;
                    return Ok(ChannelReply::PromptRearmed(prompt.ticket_id));
                }
                let updated = self.edit_description(actor, &TicketRef::Id(prompt.ticket_id), text).await?;
                Ok(ChannelReply::DescriptionUpdated(updated))
            }
            Some(Prompt { kind: PromptKind::Reply, ticket_id, .. }) => {
                let ticket = self.admin_reply(actor, &TicketRef::Id(ticket_id), text, attachment).await?;
                Ok(ChannelReply::Replied(ticket))
            }
            None => match controller::ticket::find_ticket_by_message(&*self.db, anchor).await? {
                Some(ticket) => {
                    let ticket = self.admin_reply(actor, &TicketRef::Id(ticket.id), text, attachment).await?;
                    Ok(ChannelReply::Replied(ticket))
                }
                None => {
                    log_debug!("Reply to message {} does not match any ticket", anchor);
                    Ok(ChannelReply::Dropped)
                }
            },
        }
    }

    pub async fn list(&self, actor: &Actor, filter: ListFilter) -> Result<Vec<ticket::Model>> {
        let filter = match filter {
            ListFilter::Mine => TicketFilter { user_id: Some(actor.id), limit: Some(MINE_LIMIT), ..Default::default() },
            ListFilter::Assigned => {
                self.guard.require_admin(actor.id).await?;
                TicketFilter { statuses: Some(TicketStatus::open()), admin_id: Some(actor.id), ..Default::default() }
            }
            ListFilter::AllOpen => {
                self.guard.require_admin(actor.id).await?;
                TicketFilter { statuses: Some(TicketStatus::open()), ..Default::default() }
            }
            ListFilter::ByUser(user_id) => {
                self.guard.require_admin(actor.id).await?;
                TicketFilter { user_id: Some(user_id), ..Default::default() }
            }
        };
        Ok(controller::ticket::list_tickets(&*self.db, filter).await?)
    }

    /// Fiche d'un ticket, visible par son demandeur et les administrateurs.
    pub async fn status(&self, actor: &Actor, reference: &TicketRef) -> Result<ticket::Model> {
        let ticket = self.fetch(reference).await?;
        if ticket.user_id != actor.id && !self.guard.is_admin(actor.id).await? {
            return Err(TicketError::NotFound(reference.to_string()));
        }
        Ok(ticket)
    }

    pub async fn history(&self, actor: &Actor, reference: &TicketRef) -> Result<(ticket::Model, Vec<message::Model>)> {
        self.guard.require_admin(actor.id).await?;
        let ticket = self.fetch(reference).await?;
        let messages = controller::ticket::list_messages(&*self.db, ticket.id).await?;
        Ok((ticket, messages))
    }

    /// Note de 1 à 5 donnée par le demandeur sur un ticket fermé.
    pub async fn rate(&self, actor: &Actor, reference: &TicketRef, score: i32) -> Result<ticket::Model> {
        if !(1..=5).contains(&score) {
            return Err(TicketError::validation("La note doit être comprise entre 1 et 5."));
        }
        let ticket = self.fetch(reference).await?;
        if ticket.user_id != actor.id {
            return Err(TicketError::Unauthorized("au demandeur du ticket"));
        }
        if !ticket.is_closed() {
            return Err(TicketError::InvalidState {
                number: ticket.ticket_number,
                status: ticket.status,
                action: "noter",
            });
        }
        let changes = TicketChanges { rating: Some(score), ..Default::default() };
        controller::ticket::update_ticket(&*self.db, ticket.id, changes).await?
            .ok_or_else(|| TicketError::NotFound(reference.to_string()))
    }

    pub async fn add_admin(&self, actor: &Actor, target: &Actor) -> Result<AddAdmin> {
        self.guard.require_senior(actor.id)?;
        let is_senior = self.guard.is_senior(target.id);
        Ok(controller::admin::add_admin(&*self.db, target.id, &target.name, target.handle.as_deref(), is_senior).await?)
    }
    pub async fn remove_admin(&self, actor: &Actor, target: IDType) -> Result<RemoveAdmin> {
        self.guard.require_senior(actor.id)?;
        match controller::admin::deactivate_admin(&*self.db, target).await? {
            RemoveAdmin::NotFound => Err(TicketError::AdminNotFound(target)),
            outcome => Ok(outcome),
        }
    }
    pub async fn list_admins(&self, actor: &Actor) -> Result<Vec<admin::Model>> {
        self.guard.require_senior(actor.id)?;
        Ok(controller::admin::list_active_admins(&*self.db).await?)
    }

    pub async fn stats(&self, actor: &Actor) -> Result<TicketStats> {
        self.guard.require_admin(actor.id).await?;
        Ok(controller::ticket::stats(&*self.db).await?)
    }
}
