use std::sync::Arc;
use serenity::{async_trait, http::Http, model::id::{ChannelId, UserId}};

use crate::db::IDType;
use super::{render, DeliveryError, Event, NotificationSink, Target};

/// Envoi des notifications par Discord : messages privés pour les personnes,
/// message dans le salon des administrateurs sinon.
pub struct DiscordSink {
    http: Arc<Http>,
    admin_channel: ChannelId,
}

impl DiscordSink {
    pub fn new(http: Arc<Http>, admin_channel: u64) -> Self {
        Self {
            http,
            admin_channel: ChannelId(admin_channel),
        }
    }
}

#[async_trait]
impl NotificationSink for DiscordSink {
    async fn deliver(&self, target: Target, event: &Event) -> Result<Option<IDType>, DeliveryError> {
        let text = render::event(event, target);
        match target {
            Target::User(id) | Target::Admin(id) => {
                if id <= 0 {
                    return Err(DeliveryError::Unreachable(target));
                }
                let channel = UserId(id as u64).create_dm_channel(&*self.http).await?;
                channel.say(&self.http, text).await?;
                Ok(None)
            }
            Target::SharedChannel => {
                let msg = self.admin_channel.say(&self.http, text).await?;
                Ok(Some(msg.id.0 as IDType))
            }
        }
    }
}
