//! Table de correspondance des invites en attente.
//!
//! Quand un administrateur demande à répondre à un ticket ou à modifier sa
//! description, le bot poste une invite. La réponse libre à cette invite est
//! rattachée au ticket grâce à cette table. Une invite ne sert qu'une fois.
//!
//! La table vit en mémoire, elle est perdue au redémarrage. Elle est bornée
//! en taille et en durée de vie.

use std::{collections::HashMap, time::{Duration, Instant}};
use tokio::sync::Mutex;

use crate::config::PromptConfig;
use crate::db::{IDType, model::ticket::TicketId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Reply,
    EditDescription,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prompt {
    pub kind: PromptKind,
    pub ticket_id: TicketId,
    /// Administrateur ayant ouvert l'invite
    pub opened_by: IDType,
}

#[derive(Debug)]
struct Entry {
    prompt: Prompt,
    created: Instant,
}

pub struct PromptTable {
    entries: Mutex<HashMap<IDType, Entry>>,
    ttl: Duration,
    capacity: usize,
}

impl PromptTable {
    pub fn new(config: PromptConfig) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: config.ttl,
            capacity: config.capacity.max(1),
        }
    }
    /// Enregistre une invite sur le message `anchor`.
    ///
    /// Les entrées expirées sont purgées, puis la plus ancienne est évincée
    /// si la table est pleine.
    pub async fn open(&self, anchor: IDType, prompt: Prompt) {
        self.open_at(anchor, prompt, Instant::now()).await
    }
    async fn open_at(&self, anchor: IDType, prompt: Prompt, now: Instant) {
        let mut entries = self.entries.lock().await;
        let ttl = self.ttl;
        entries.retain(|_, entry| now.saturating_duration_since(entry.created) < ttl);
        if !entries.contains_key(&anchor) && entries.len() >= self.capacity {
            let oldest = entries.iter()
                .min_by_key(|(_, entry)| entry.created)
                .map(|(anchor, _)| *anchor);
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }
        entries.insert(anchor, Entry { prompt, created: now });
    }
    /// Consomme l'invite attachée à `anchor`.
    ///
    /// Le retrait se fait sous le verrou : deux réponses simultanées ne
    /// peuvent pas obtenir la même invite.
    pub async fn take(&self, anchor: IDType) -> Option<Prompt> {
        self.take_at(anchor, Instant::now()).await
    }
    async fn take_at(&self, anchor: IDType, now: Instant) -> Option<Prompt> {
        let entry = self.entries.lock().await.remove(&anchor)?;
        if now.saturating_duration_since(entry.created) < self.ttl {
            Some(entry.prompt)
        } else {
            None
        }
    }
    /// Retire toutes les invites ouvertes par un administrateur.
    pub async fn cancel_for(&self, actor: IDType) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.prompt.opened_by != actor);
        before - entries.len()
    }
    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}
