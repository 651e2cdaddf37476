//! Interface de discussion du bot.
//!
//! Traduit les messages Discord en appels au moteur de tickets et renvoie
//! le résultat dans le salon d'origine.

pub mod parser;

use std::sync::Arc;
use serenity::{
    async_trait,
    client::{Context, EventHandler},
    model::{channel::Message, gateway::Ready, id::{ChannelId, UserId}, user::User},
};

use crate::db::IDType;
use crate::notify::render;
use crate::tickets::{wizard::Step, Actor, ChannelReply, ListFilter, TicketEngine, TicketError, TicketRef};
use crate::db::controller::admin::{AddAdmin, RemoveAdmin};
use crate::{log_debug, log_error, log_info, log_warn};
use parser::{matching, next_token, parse_mention, Argument, Command, Scope};

type Reply = Result<String, TicketError>;

/// Définition des commandes
fn definitions() -> Vec<Command> {
    let ticket = || Argument::new("ticket").set_help("Numéro du ticket, ex: 00001").set_required(true);
    let text = |name: &str| Argument::new(name).set_rest(true);
    vec![
        Command::new("help").set_help("Affiche cette aide"),
        Command::new("new").set_help("Crée un ticket pas à pas"),
        Command::new("category")
            .set_help("Choisit la catégorie du ticket en cours (network, software, hardware, access, other)")
            .add_argument(Argument::new("categorie").set_required(true)),
        Command::new("priority")
            .set_help("Choisit la priorité du ticket en cours (low, medium, high)")
            .add_argument(Argument::new("priorite").set_required(true)),
        Command::new("confirm").set_help("Crée le ticket en cours"),
        Command::new("cancel").set_help("Annule la saisie en cours"),
        Command::new("ticket")
            .set_help("Crée directement un ticket")
            .add_argument(text("description").set_required(true)),
        Command::new("my").set_help("Vos derniers tickets"),
        Command::new("status").set_help("État d'un ticket").add_argument(ticket()),
        Command::new("reply")
            .set_help("Répond sur un de vos tickets")
            .add_argument(ticket())
            .add_argument(text("message")),
        Command::new("rate")
            .set_help("Note un ticket fermé de 1 à 5")
            .add_argument(ticket())
            .add_argument(Argument::new("note").set_required(true)),

        Command::new("tickets").set_help("Tickets ouverts").set_scope(Scope::Admin),
        Command::new("assigned").set_help("Vos tickets assignés").set_scope(Scope::Admin),
        Command::new("user")
            .set_help("Tickets d'un utilisateur")
            .set_scope(Scope::Admin)
            .add_argument(Argument::new("utilisateur").set_required(true)),
        Command::new("claim").set_help("Prend en charge un ticket").set_scope(Scope::Admin).add_argument(ticket()),
        Command::new("hold").set_help("Met un ticket en attente").set_scope(Scope::Admin).add_argument(ticket()),
        Command::new("resume").set_help("Reprend un ticket en attente").set_scope(Scope::Admin).add_argument(ticket()),
        Command::new("close").set_help("Ferme un ticket").set_scope(Scope::Admin).add_argument(ticket()),
        Command::new("transfer").set_help("Remet un ticket dans la file").set_scope(Scope::Admin).add_argument(ticket()),
        Command::new("setcategory")
            .set_help("Change la catégorie d'un ticket")
            .set_scope(Scope::Admin)
            .add_argument(ticket())
            .add_argument(Argument::new("categorie").set_required(true)),
        Command::new("setpriority")
            .set_help("Change la priorité d'un ticket")
            .set_scope(Scope::Admin)
            .add_argument(ticket())
            .add_argument(Argument::new("priorite").set_required(true)),
        Command::new("setdescription")
            .set_help("Remplace la description d'un ticket")
            .set_scope(Scope::Admin)
            .add_argument(ticket())
            .add_argument(text("description").set_required(true)),
        Command::new("answer")
            .set_help("Répond au demandeur, directement ou en répondant au message du bot")
            .set_scope(Scope::Admin)
            .add_argument(ticket())
            .add_argument(text("message")),
        Command::new("edit")
            .set_help("Modifie la description en répondant au message du bot")
            .set_scope(Scope::Admin)
            .add_argument(ticket()),
        Command::new("history").set_help("Messages d'un ticket").set_scope(Scope::Admin).add_argument(ticket()),
        Command::new("clear").set_help("Efface les messages d'un ticket").set_scope(Scope::Admin).add_argument(ticket()),
        Command::new("delete").set_help("Supprime un ticket").set_scope(Scope::Admin).add_argument(ticket()),
        Command::new("stats").set_help("Statistiques des tickets").set_scope(Scope::Admin),

        Command::new("addadmin")
            .set_help("Ajoute un administrateur")
            .set_scope(Scope::Senior)
            .add_argument(Argument::new("utilisateur").set_required(true)),
        Command::new("removeadmin")
            .set_help("Retire un administrateur")
            .set_scope(Scope::Senior)
            .add_argument(Argument::new("utilisateur").set_required(true)),
        Command::new("admins").set_help("Liste les administrateurs").set_scope(Scope::Senior),
    ]
}

fn actor_of(user: &User) -> Actor {
    actor_from(user.id, &user.name)
}

fn actor_from(id: UserId, name: &str) -> Actor {
    Actor::new(id.0 as IDType, name).with_handle(name)
}

fn step_text(step: Step, prefix: char) -> String {
    match step {
        Step::Category => format!("Choisissez {} avec `{}category <valeur>`.", step.hint(), prefix),
        Step::Priority => format!("Choisissez {} avec `{}priority <valeur>`.", step.hint(), prefix),
        Step::Description => "Décrivez votre problème dans un message privé, une pièce jointe est acceptée.".to_string(),
        Step::Confirm => format!("Le ticket est prêt : `{0}confirm` pour l'envoyer, `{0}cancel` pour abandonner.", prefix),
    }
}

pub struct Handler {
    engine: Arc<TicketEngine>,
    prefix: char,
    admin_channel: ChannelId,
    commands: Vec<Command>,
}

impl Handler {
    pub fn new(engine: Arc<TicketEngine>, prefix: char, admin_channel: u64) -> Self {
        Self {
            engine,
            prefix,
            admin_channel: ChannelId(admin_channel),
            commands: definitions(),
        }
    }

    async fn help(&self, actor: &Actor) -> Reply {
        let scope = if self.engine.guard().is_senior(actor.id) {
            Scope::Senior
        } else if self.engine.guard().is_admin(actor.id).await? {
            Scope::Admin
        } else {
            Scope::User
        };
        Ok(self.commands.iter()
            .filter(|c| c.scope <= scope)
            .map(|c| c.usage(self.prefix))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    /// Poste l'invite puis l'enregistre. L'invite est retirée si le moteur
    /// la refuse.
    async fn prompt(&self, ctx: &Context, msg: &Message, actor: &Actor, reference: TicketRef, edit: bool) -> Reply {
        let text = match edit {
            true => format!("✏️ Répondez à ce message avec la nouvelle description du ticket {}.", reference),
            false => format!("✍️ Répondez à ce message pour écrire au demandeur du ticket {}.", reference),
        };
        let prompt = msg.channel_id.say(&ctx.http, text).await
            .map_err(|e| TicketError::Delivery(e.into()))?;
        let anchor = prompt.id.0 as IDType;
        let opened = match edit {
            true => self.engine.open_edit_prompt(actor, &reference, anchor).await,
            false => self.engine.open_reply_prompt(actor, &reference, anchor).await,
        };
        if let Err(e) = opened {
            if let Err(e) = prompt.delete(ctx).await {
                log_warn!("Unable to delete prompt {}: {}", anchor, e);
            }
            return Err(e);
        }
        Ok(String::new())
    }

    async fn target_actor(&self, ctx: &Context, id: IDType) -> Actor {
        match UserId(id as u64).to_user(ctx).await {
            Ok(user) => actor_of(&user),
            Err(e) => {
                log_warn!("Unable to fetch user {}: {}", id, e);
                Actor::new(id, id.to_string())
            }
        }
    }

    async fn run(&self, ctx: &Context, msg: &Message, actor: &Actor, cmd: &matching::Command<'_>, attachment: Option<String>) -> Reply {
        let engine = &*self.engine;
        let arg = |name: &str| cmd.get(name).unwrap_or_default();
        let reference = || TicketRef::number(arg("ticket"));
        let mention = |name: &str| parse_mention(arg(name))
            .ok_or_else(|| TicketError::validation(format!("Utilisateur invalide : {}", arg(name))));
        let done = |verb: &str, ticket: &crate::db::model::ticket::Model| format!("Ticket {} {}.", ticket.ticket_number, verb);

        match cmd.name {
            "help" => self.help(actor).await,
            "new" => Ok(step_text(engine.start_wizard(actor).await?, self.prefix)),
            "category" => Ok(step_text(engine.wizard_category(actor, arg("categorie")).await?, self.prefix)),
            "priority" => Ok(step_text(engine.wizard_priority(actor, arg("priorite")).await?, self.prefix)),
            "confirm" => engine.confirm_wizard(actor).await.map(|t| done("créé, un administrateur va le traiter", &t)),
            "cancel" => Ok(match engine.cancel(actor).await {
                true => "Saisie annulée.".to_string(),
                false => "Rien à annuler.".to_string(),
            }),
            "ticket" => engine.quick_create(actor, arg("description"), attachment).await.map(|t| done("créé", &t)),
            "my" => engine.list(actor, ListFilter::Mine).await.map(|t| render::ticket_list(&t)),
            "status" => engine.status(actor, &reference()).await.map(|t| render::ticket(&t)),
            "reply" => engine.user_reply(actor, &reference(), arg("message"), attachment).await.map(|t| done("mis à jour, réponse transmise", &t)),
            "rate" => {
                let score = arg("note").parse::<i32>()
                    .map_err(|_| TicketError::validation("La note doit être un nombre entre 1 et 5."))?;
                engine.rate(actor, &reference(), score).await.map(|t| done("noté, merci", &t))
            }

            "tickets" => engine.list(actor, ListFilter::AllOpen).await.map(|t| render::ticket_list(&t)),
            "assigned" => engine.list(actor, ListFilter::Assigned).await.map(|t| render::ticket_list(&t)),
            "user" => engine.list(actor, ListFilter::ByUser(mention("utilisateur")?)).await.map(|t| render::ticket_list(&t)),
            "claim" => engine.claim(actor, &reference()).await.map(|t| done("pris en charge", &t)),
            "hold" => engine.hold(actor, &reference()).await.map(|t| done("mis en attente", &t)),
            "resume" => engine.resume(actor, &reference()).await.map(|t| done("repris", &t)),
            "close" => engine.close(actor, &reference()).await.map(|t| done("fermé", &t)),
            "transfer" => engine.transfer(actor, &reference()).await.map(|t| done("remis dans la file", &t)),
            "setcategory" => engine.edit_category(actor, &reference(), arg("categorie")).await.map(|t| done("modifié", &t)),
            "setpriority" => engine.edit_priority(actor, &reference(), arg("priorite")).await.map(|t| done("modifié", &t)),
            "setdescription" => engine.edit_description(actor, &reference(), arg("description")).await.map(|t| done("modifié", &t)),
            "answer" => match cmd.get("message") {
                Some(text) => engine.admin_reply(actor, &reference(), text, attachment).await.map(|t| done("mis à jour, réponse envoyée", &t)),
                None if attachment.is_some() => engine.admin_reply(actor, &reference(), "", attachment).await.map(|t| done("mis à jour, pièce jointe envoyée", &t)),
                None => self.prompt(ctx, msg, actor, reference(), false).await,
            },
            "edit" => self.prompt(ctx, msg, actor, reference(), true).await,
            "history" => engine.history(actor, &reference()).await.map(|(t, messages)| render::history(&t, &messages)),
            "clear" => engine.clear_history(actor, &reference()).await.map(|count| format!("{} messages effacés.", count)),
            "delete" => engine.delete(actor, &reference()).await.map(|number| format!("Ticket {} supprimé.", number)),
            "stats" => engine.stats(actor).await.map(|stats| render::stats(&stats)),

            "addadmin" => {
                let target = self.target_actor(ctx, mention("utilisateur")?).await;
                engine.add_admin(actor, &target).await.map(|outcome| match outcome {
                    AddAdmin::Created => format!("{} est maintenant administrateur.", target.display_name()),
                    AddAdmin::Reactivated => format!("{} est de nouveau administrateur.", target.display_name()),
                    AddAdmin::AlreadyActive => format!("{} est déjà administrateur.", target.display_name()),
                })
            }
            "removeadmin" => {
                let target = mention("utilisateur")?;
                engine.remove_admin(actor, target).await.map(|outcome| match outcome {
                    RemoveAdmin::AlreadyInactive => format!("<@{}> n'est déjà plus administrateur.", target),
                    _ => format!("<@{}> n'est plus administrateur.", target),
                })
            }
            "admins" => engine.list_admins(actor).await.map(|admins| render::admin_list(&admins)),
            other => {
                log_error!("Command {} is declared but not handled", other);
                Ok(String::new())
            }
        }
    }

    async fn command(&self, ctx: &Context, msg: &Message, actor: &Actor, line: &str, attachment: Option<String>) -> Option<String> {
        let name = next_token(line)?.0;
        let command = match self.commands.iter().find(|c| c.name.eq_ignore_ascii_case(name)) {
            Some(command) => command,
            None => return Some(format!("Commande inconnue, `{}help` pour la liste.", self.prefix)),
        };
        let matched = match command.try_match(line) {
            Ok(matched) => matched,
            Err(e) => return Some(format!("{}\n{}", e.to_string(), command.usage(self.prefix))),
        };
        log_debug!("{} ({}) runs {}", actor.display_name(), actor.id, matched.name);
        Some(self.answer(self.run(ctx, msg, actor, &matched, attachment).await))
    }

    /// Réponses libres : invites et message du ticket dans le salon des
    /// administrateurs, description de l'assistant en message privé.
    async fn free_text(&self, msg: &Message, actor: &Actor, attachment: Option<String>) -> Option<String> {
        if msg.channel_id == self.admin_channel {
            let anchor = msg.message_reference.as_ref()?.message_id?;
            let outcome = self.engine.resolve_channel_reply(actor, anchor.0 as IDType, &msg.content, attachment).await;
            return match outcome {
                Ok(ChannelReply::Replied(t)) => Some(format!("Réponse envoyée sur le ticket {}.", t.ticket_number)),
                Ok(ChannelReply::DescriptionUpdated(t)) => Some(format!("Description du ticket {} modifiée.", t.ticket_number)),
                Ok(ChannelReply::PromptRearmed(_)) => Some("La description ne peut pas être vide, répondez de nouveau au message.".to_string()),
                Ok(ChannelReply::Dropped) => None,
                Err(TicketError::Unauthorized(_)) => None,
                Err(e) => Some(self.answer(Err(e))),
            };
        }
        if msg.guild_id.is_none() && self.engine.wizard_step(actor).await == Some(Step::Description) {
            let step = self.engine.wizard_description(actor, &msg.content, attachment).await;
            return Some(self.answer(step.map(|step| step_text(step, self.prefix))));
        }
        None
    }

    fn answer(&self, reply: Reply) -> String {
        match reply {
            Ok(text) => text,
            Err(e @ TicketError::Store(_)) => {
                log_error!("Store failure: {:?}", e);
                e.to_string()
            }
            Err(e @ TicketError::Delivery(_)) => {
                log_error!("Delivery failure: {:?}", e);
                e.to_string()
            }
            Err(e) => e.to_string(),
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _: Context, ready: Ready) {
        log_info!("{} is connected!", ready.user.name);
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        let actor = actor_of(&msg.author);
        let attachment = msg.attachments.first().map(|a| a.url.clone());
        let reply = match msg.content.strip_prefix(self.prefix) {
            Some(line) => self.command(&ctx, &msg, &actor, line, attachment).await,
            None => self.free_text(&msg, &actor, attachment).await,
        };
        match reply {
            Some(text) if !text.is_empty() => {
                if let Err(e) = msg.channel_id.say(&ctx.http, text).await {
                    log_warn!("Unable to answer in channel {}: {}", msg.channel_id, e);
                }
            }
            _ => (),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actor_handle_has_no_discriminator() {
        let actor = actor_from(UserId(42), "alice");
        assert_eq!(actor.id, 42);
        assert_eq!(actor.handle.as_deref(), Some("alice"));
        assert_eq!(actor.display_name(), "@alice");
    }
}
