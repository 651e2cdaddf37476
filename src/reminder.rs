//! Relance périodique des tickets en souffrance.
//!
//! Chaque passage est indépendant : un ticket toujours en souffrance est
//! relancé à chaque passage. L'échec d'un envoi ou d'un passage n'arrête
//! pas la boucle.

use std::sync::Arc;
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;

use crate::config::ReminderConfig;
use crate::db::{controller::{self, ticket::Since}, model::ticket::{self, TicketStatus}};
use crate::notify::{Dispatcher, Event, Target, TicketSummary};
use crate::{log_debug, log_error, log_info};

/// Bilan d'un passage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub unclaimed: usize,
    pub on_hold: usize,
    pub in_progress: usize,
    /// Envois ayant échoué
    pub failed: usize,
}

impl SweepReport {
    pub fn sent(&self) -> usize {
        self.unclaimed + self.on_hold + self.in_progress - self.failed
    }
}

pub struct ReminderScheduler {
    db: Arc<DatabaseConnection>,
    dispatcher: Dispatcher,
    config: ReminderConfig,
}

fn threshold(now: DateTime<Utc>, after: std::time::Duration) -> DateTime<Utc> {
    match chrono::Duration::from_std(after) {
        Ok(after) => now - after,
        Err(_) => DateTime::<Utc>::MIN_UTC,
    }
}

impl ReminderScheduler {
    pub fn new(db: Arc<DatabaseConnection>, dispatcher: Dispatcher, config: ReminderConfig) -> Self {
        Self { db, dispatcher, config }
    }

    async fn remind<F>(&self, tickets: Vec<ticket::Model>, to: F, failed: &mut usize) -> usize
    where
        F: Fn(&ticket::Model) -> Option<(Target, Event)>,
    {
        let mut count = 0;
        for ticket in &tickets {
            if let Some((target, event)) = to(ticket) {
                count += 1;
                if self.dispatcher.notify_logged(target, &event).await.is_none() {
                    *failed += 1;
                }
            }
        }
        count
    }

    /// Un passage complet à l'instant `now`.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport, controller::Error> {
        let db = &*self.db;
        let mut report = SweepReport::default();

        let unclaimed = controller::ticket::stale_tickets(db, TicketStatus::New, Since::Creation, threshold(now, self.config.new_after)).await?;
        report.unclaimed = self.remind(unclaimed, |t| {
            Some((Target::SharedChannel, Event::ReminderUnclaimed { ticket: TicketSummary::from(t) }))
        }, &mut report.failed).await;

        let on_hold = controller::ticket::stale_tickets(db, TicketStatus::OnHold, Since::LastUpdate, threshold(now, self.config.on_hold_after)).await?;
        report.on_hold = self.remind(on_hold, |t| {
            Some((Target::User(t.user_id), Event::ReminderOnHold { ticket: TicketSummary::from(t) }))
        }, &mut report.failed).await;

        let in_progress = controller::ticket::stale_tickets(db, TicketStatus::InProgress, Since::LastUpdate, threshold(now, self.config.in_progress_after)).await?;
        report.in_progress = self.remind(in_progress, |t| {
            t.admin_id.map(|admin_id| (Target::Admin(admin_id), Event::ReminderInProgress { ticket: TicketSummary::from(t) }))
        }, &mut report.failed).await;

        Ok(report)
    }

    /// Boucle infinie, le premier passage a lieu après un intervalle.
    pub async fn run(self) {
        log_info!("Reminders every {} seconds", self.config.interval.as_secs());
        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // Le premier tick est immédiat
        interval.tick().await;
        loop {
            interval.tick().await;
            match self.sweep(Utc::now()).await {
                Ok(report) => log_debug!("Reminder sweep: {:?}", report),
                Err(e) => log_error!("Reminder sweep failed: {}", e),
            }
        }
    }

    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
