//! Core de l'application.
//! L'assemblage du moteur de tickets, des relances et du client Discord se
//! fait dans ce module.

use std::sync::Arc;
use sea_orm::DatabaseConnection;
use serenity::{Client, http::Http, prelude::GatewayIntents};

use crate::{
    access::AccessGuard,
    commands::Handler,
    config::Config,
    notify::{discord::DiscordSink, Dispatcher},
    reminder::ReminderScheduler,
    tickets::{prompt::PromptTable, TicketEngine},
};
use crate::log_info;

type Result<T> = serenity::Result<T>;

/// Structure du bot.
///
/// Le moteur de tickets est partagé entre le gestionnaire d'événements
/// Discord et la tâche de relance, qui tourne en parallèle.
pub struct Bot {
    /// Client discord de serenity
    client: Client,
    reminders: Option<ReminderScheduler>,
    reminder_handle: Option<tokio::task::JoinHandle<()>>,
}

impl Bot {
    /// Crée un nouveau bot et l'initialise.
    pub async fn new(config: &Config, db: DatabaseConnection) -> Result<Bot> {
        let db = Arc::new(db);
        let http = Arc::new(Http::new(&config.token));
        let dispatcher = Dispatcher::new(Arc::new(DiscordSink::new(http, config.admin_channel)));
        let guard = AccessGuard::new(config.senior_admins.iter().copied(), db.clone());
        let engine = Arc::new(TicketEngine::new(
            db.clone(),
            guard,
            dispatcher.clone(),
            PromptTable::new(config.prompts),
            config.tickets,
        ));
        let reminders = ReminderScheduler::new(db, dispatcher, config.reminders);
        let intents = GatewayIntents::GUILD_MESSAGES | GatewayIntents::DIRECT_MESSAGES | GatewayIntents::MESSAGE_CONTENT;
        let client = Client::builder(&config.token, intents)
            .event_handler(Handler::new(engine, config.prefix, config.admin_channel))
            .await?;
        Ok(Bot {
            client,
            reminders: Some(reminders),
            reminder_handle: None,
        })
    }
    /// Lance les relances puis le bot.
    pub async fn start(&mut self) -> Result<()> {
        if let Some(reminders) = self.reminders.take() {
            self.reminder_handle = Some(reminders.spawn());
        }
        self.client.start().await
    }
}

impl Drop for Bot {
    fn drop(&mut self) {
        if let Some(handle) = self.reminder_handle.take() {
            handle.abort();
        }
        log_info!("Bot dropped");
    }
}
