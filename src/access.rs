//! Droits des acteurs.
//!
//! Les seniors sont fixés par la configuration : ils gardent la main même si
//! la table des administrateurs est vide ou abîmée.

use std::{collections::HashSet, sync::Arc};
use sea_orm::DatabaseConnection;

use crate::db::{IDType, controller};
use crate::tickets::TicketError;

#[derive(Clone)]
pub struct AccessGuard {
    seniors: HashSet<IDType>,
    db: Arc<DatabaseConnection>,
}

impl AccessGuard {
    pub fn new<I: IntoIterator<Item = IDType>>(seniors: I, db: Arc<DatabaseConnection>) -> Self {
        Self {
            seniors: seniors.into_iter().collect(),
            db,
        }
    }
    pub fn is_senior(&self, actor: IDType) -> bool {
        self.seniors.contains(&actor)
    }
    pub async fn is_admin(&self, actor: IDType) -> Result<bool, controller::Error> {
        if self.is_senior(actor) {
            return Ok(true);
        }
        controller::admin::is_active_admin(&*self.db, actor).await
    }
    pub async fn require_admin(&self, actor: IDType) -> Result<(), TicketError> {
        match self.is_admin(actor).await? {
            true => Ok(()),
            false => Err(TicketError::Unauthorized("aux administrateurs")),
        }
    }
    pub fn require_senior(&self, actor: IDType) -> Result<(), TicketError> {
        match self.is_senior(actor) {
            true => Ok(()),
            false => Err(TicketError::Unauthorized("aux administrateurs seniors")),
        }
    }
}
