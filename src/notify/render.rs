//! Mise en forme des notifications et des réponses du bot.

use std::fmt::Write;

use crate::db::model::{
    admin,
    ticket::{self, message::{self, SenderRole}, TicketCategory, TicketPriority, TicketStatus},
};
use crate::db::controller::ticket::TicketStats;
use super::{Event, Target, TicketSummary};

pub fn status_label(status: TicketStatus) -> &'static str {
    match status {
        TicketStatus::New => "nouveau",
        TicketStatus::InProgress => "en cours",
        TicketStatus::OnHold => "en attente",
        TicketStatus::Closed => "fermé",
    }
}

pub fn category_label(category: TicketCategory) -> &'static str {
    match category {
        TicketCategory::Network => "Réseau",
        TicketCategory::Software => "Logiciel",
        TicketCategory::Hardware => "Matériel",
        TicketCategory::Access => "Accès",
        TicketCategory::Other => "Autre",
    }
}

pub fn priority_label(priority: TicketPriority) -> &'static str {
    match priority {
        TicketPriority::Low => "basse",
        TicketPriority::Medium => "moyenne",
        TicketPriority::High => "haute",
    }
}

fn header(ticket: &TicketSummary) -> String {
    format!(
        "**Ticket {}** [{}] - {} / priorité {}",
        ticket.number,
        status_label(ticket.status),
        category_label(ticket.category),
        priority_label(ticket.priority)
    )
}

/// Texte d'une notification pour un destinataire donné.
pub fn event(event: &Event, target: Target) -> String {
    let ticket = event.ticket();
    match event {
        Event::Created { owner, .. } => format!(
            "🆕 {}\nDe : {}\n> {}\nRépondez à ce message pour écrire au demandeur.",
            header(ticket), owner, ticket.description
        ),
        Event::Claimed { admin, .. } => format!("✅ Votre ticket {} a été pris en charge par {}.", ticket.number, admin),
        Event::OnHold { .. } => format!("⏸️ Votre ticket {} a été mis en attente.", ticket.number),
        Event::Resumed { .. } => format!("▶️ Le traitement de votre ticket {} a repris.", ticket.number),
        Event::Closed { .. } => format!(
            "🔒 Votre ticket {} a été fermé.\nVous pouvez noter le traitement avec `rate {} <1-5>`.",
            ticket.number, ticket.number
        ),
        Event::Transferred { by, .. } if target == Target::SharedChannel => format!(
            "🔁 {}\nRemis en file par {}.\n> {}\nRépondez à ce message pour écrire au demandeur.",
            header(ticket), by, ticket.description
        ),
        Event::Transferred { .. } => format!("🔁 Votre ticket {} a été transféré à un autre administrateur.", ticket.number),
        Event::ReplyReceived { from, sender, text, attachment, .. } => {
            let mut msg = match from {
                SenderRole::Admin => format!("💬 Réponse du support sur le ticket {} :", ticket.number),
                SenderRole::User => format!("💬 {} a répondu sur le ticket {} :", sender, ticket.number),
            };
            if let Some(text) = text {
                let _ = write!(msg, "\n> {}", text);
            }
            if let Some(attachment) = attachment {
                let _ = write!(msg, "\n📎 {}", attachment);
            }
            msg
        }
        Event::ReminderUnclaimed { .. } => format!("⏰ Le ticket {} attend toujours d'être pris en charge.\n{}", ticket.number, header(ticket)),
        Event::ReminderOnHold { .. } => format!(
            "⏰ Votre ticket {} est toujours en attente. Répondez avec `reply {} <message>` pour le relancer.",
            ticket.number, ticket.number
        ),
        Event::ReminderInProgress { .. } => format!("⏰ Le ticket {} est en cours depuis longtemps sans activité.", ticket.number),
    }
}

/// Fiche complète d'un ticket
pub fn ticket(ticket: &ticket::Model) -> String {
    let mut msg = header(&TicketSummary::from(ticket));
    let _ = write!(msg, "\nOuvert le {}", ticket.created_at.format("%d/%m/%Y %H:%M"));
    if let Some(admin_id) = ticket.admin_id {
        let _ = write!(msg, "\nAssigné à <@{}>", admin_id);
    }
    if let Some(closed_at) = ticket.closed_at {
        let _ = write!(msg, "\nFermé le {}", closed_at.format("%d/%m/%Y %H:%M"));
    }
    if let Some(rating) = ticket.rating {
        let _ = write!(msg, "\nNote : {}/5", rating);
    }
    let _ = write!(msg, "\n> {}", ticket.description);
    msg
}

/// Une ligne par ticket
pub fn ticket_list(tickets: &[ticket::Model]) -> String {
    if tickets.is_empty() {
        return "Aucun ticket.".to_string();
    }
    tickets.iter()
        .map(|t| format!(
            "{} [{}] {} / {} - {}",
            t.ticket_number,
            status_label(t.status),
            category_label(t.category),
            priority_label(t.priority),
            first_line(&t.description)
        ))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn history(ticket: &ticket::Model, messages: &[message::Model]) -> String {
    let mut msg = format!("Historique du ticket {}", ticket.ticket_number);
    if messages.is_empty() {
        msg.push_str("\nAucun message.");
    }
    for entry in messages {
        let who = match entry.sender_role {
            SenderRole::User => "Utilisateur",
            SenderRole::Admin => "Support",
        };
        let _ = write!(msg, "\n[{}] {} <@{}> : {}", entry.created_at.format("%d/%m %H:%M"), who, entry.sender_id, entry.text.as_deref().unwrap_or(""));
        if let Some(attachment) = &entry.attachment {
            let _ = write!(msg, " 📎 {}", attachment);
        }
    }
    msg
}

pub fn admin_list(admins: &[admin::Model]) -> String {
    if admins.is_empty() {
        return "Aucun administrateur enregistré.".to_string();
    }
    admins.iter()
        .map(|a| format!("{} ({}){}", a.display_name(), a.id, if a.is_senior { " - senior" } else { "" }))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn stats(stats: &TicketStats) -> String {
    let mut msg = format!("📊 {} tickets", stats.total);
    for (status, count) in &stats.by_status {
        let _ = write!(msg, "\n- {} : {}", status_label(*status), count);
    }
    msg.push_str("\nPar priorité :");
    for (priority, count) in &stats.by_priority {
        let _ = write!(msg, "\n- {} : {}", priority_label(*priority), count);
    }
    match stats.average_rating {
        Some(average) => { let _ = write!(msg, "\nNote moyenne : {:.1}/5", average); }
        None => msg.push_str("\nAucune note."),
    }
    msg
}

fn first_line(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > 60 {
        format!("{}…", line.chars().take(60).collect::<String>())
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_description_is_cut() {
        let text = "a".repeat(80);
        assert_eq!(first_line(&text).chars().count(), 61);
        assert_eq!(first_line("court\nsuite"), "court");
    }

    #[test]
    fn transfer_text_depends_on_target() {
        let event = Event::Transferred {
            ticket: TicketSummary {
                id: 1,
                number: "#00002".to_string(),
                user_id: 1,
                admin_id: None,
                status: TicketStatus::New,
                category: TicketCategory::Access,
                priority: TicketPriority::Low,
                description: "mot de passe".to_string(),
            },
            by: "alice".to_string(),
        };
        assert!(super::event(&event, Target::SharedChannel).contains("Remis en file par alice"));
        assert!(super::event(&event, Target::User(1)).starts_with("🔁 Votre ticket #00002"));
    }
}
