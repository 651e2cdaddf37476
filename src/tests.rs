use std::sync::Arc;
use chrono::{Duration, Utc};
use sea_orm::{entity::*, query::*, sea_query::Expr, DbConn};

use crate::access::AccessGuard;
use crate::config::{PromptConfig, ReminderConfig, TicketPolicy};
use crate::db::{
    memory_db, IDType,
    controller::admin::{add_admin, list_active_admins, AddAdmin, RemoveAdmin},
    model::{self, ticket::{self, message, TicketCategory, TicketPriority, TicketStatus}},
};
use crate::notify::{testing::RecordingSink, Dispatcher, Event, Target};
use crate::reminder::ReminderScheduler;
use crate::tickets::{prompt::PromptTable, wizard::Step, Actor, ChannelReply, ListFilter, TicketEngine, TicketError, TicketRef};

const SENIOR: IDType = 1;
const ALICE: IDType = 2;
const BOB: IDType = 3;
const USER: IDType = 10;
const OTHER_USER: IDType = 11;

struct Fixture {
    engine: Arc<TicketEngine>,
    db: Arc<DbConn>,
    sink: Arc<RecordingSink>,
    dispatcher: Dispatcher,
}

async fn fixture_with(policy: TicketPolicy) -> Fixture {
    let db = Arc::new(memory_db().await);
    let sink = RecordingSink::new();
    let dispatcher = Dispatcher::new(sink.clone());
    add_admin(&*db, ALICE, "alice", None, false).await.unwrap();
    add_admin(&*db, BOB, "bob", None, false).await.unwrap();
    let engine = TicketEngine::new(
        db.clone(),
        AccessGuard::new([SENIOR], db.clone()),
        dispatcher.clone(),
        PromptTable::new(PromptConfig::default()),
        policy,
    );
    Fixture { engine: Arc::new(engine), db, sink, dispatcher }
}

async fn fixture() -> Fixture {
    fixture_with(TicketPolicy::default()).await
}

fn actor(id: IDType) -> Actor {
    Actor::new(id, format!("actor{}", id))
}

fn by_number(number: &str) -> TicketRef {
    TicketRef::number(number)
}

impl Fixture {
    async fn open_ticket(&self, description: &str) -> ticket::Model {
        self.engine.create(&actor(USER), TicketCategory::Software, TicketPriority::Medium, description, None).await.unwrap()
    }
    async fn reload(&self, id: ticket::TicketId) -> ticket::Model {
        model::Ticket::find_by_id(id).one(&*self.db).await.unwrap().unwrap()
    }
    async fn message_count(&self, id: ticket::TicketId) -> u64 {
        model::TicketMessage::find()
            .filter(message::Column::TicketId.eq(id))
            .count(&*self.db).await.unwrap()
    }
    /// Recule les dates d'un ticket
    async fn backdate(&self, id: ticket::TicketId, created: Duration, updated: Duration) {
        let now = Utc::now();
        model::Ticket::update_many()
            .col_expr(ticket::Column::CreatedAt, Expr::value(now - created))
            .col_expr(ticket::Column::UpdatedAt, Expr::value(now - updated))
            .filter(ticket::Column::Id.eq(id))
            .exec(&*self.db).await.unwrap();
    }
    fn reminders(&self) -> ReminderScheduler {
        ReminderScheduler::new(self.db.clone(), self.dispatcher.clone(), ReminderConfig::default())
    }
}

fn assert_invariants(ticket: &ticket::Model) {
    assert_eq!(ticket.closed_at.is_some(), ticket.status == TicketStatus::Closed, "closed_at of {}", ticket.ticket_number);
    if ticket.admin_id.is_some() {
        assert!(matches!(ticket.status, TicketStatus::InProgress | TicketStatus::OnHold), "admin_id of {}", ticket.ticket_number);
    }
}

#[tokio::test]
async fn create_claim_close() {
    let fx = fixture().await;
    let created = fx.engine.create(&actor(USER), TicketCategory::Network, TicketPriority::High, "VPN down", None).await.unwrap();
    assert_eq!(created.ticket_number, "#00001");
    assert_eq!(created.status, TicketStatus::New);
    assert_eq!(created.admin_id, None);
    assert_eq!(created.message_id, Some(1000));
    assert_eq!(fx.message_count(created.id).await, 1);
    assert_eq!(fx.sink.names_for(Target::SharedChannel).await, vec!["ticket_created"]);

    let claimed = fx.engine.claim(&actor(ALICE), &by_number("00001")).await.unwrap();
    assert_eq!(claimed.status, TicketStatus::InProgress);
    assert_eq!(claimed.admin_id, Some(ALICE));
    assert_invariants(&claimed);

    let closed = fx.engine.close(&actor(ALICE), &by_number("#00001")).await.unwrap();
    assert_eq!(closed.status, TicketStatus::Closed);
    assert!(closed.closed_at.is_some());
    assert_eq!(closed.admin_id, None);
    assert_invariants(&closed);
    assert_eq!(fx.sink.names_for(Target::User(USER)).await, vec!["ticket_claimed", "ticket_closed"]);

    let again = fx.engine.close(&actor(ALICE), &by_number("00001")).await;
    assert!(matches!(again, Err(TicketError::InvalidState { status: TicketStatus::Closed, .. })));
}

#[tokio::test]
async fn concurrent_claims_have_one_winner() {
    let fx = fixture().await;
    for i in 0..7 {
        fx.open_ticket(&format!("panne {}", i)).await;
    }
    let reference = by_number("00007");
    let (alice, bob) = (actor(ALICE), actor(BOB));
    let (first, second) = tokio::join!(
        fx.engine.claim(&alice, &reference),
        fx.engine.claim(&bob, &reference),
    );
    let winners = [&first, &second].iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    let loser = if first.is_ok() { second } else { first };
    assert!(matches!(loser, Err(TicketError::InvalidState { .. })));

    let stored = fx.engine.status(&actor(SENIOR), &reference).await.unwrap();
    assert_eq!(stored.ticket_number, "#00007");
    assert_eq!(stored.status, TicketStatus::InProgress);
    assert!(stored.admin_id == Some(ALICE) || stored.admin_id == Some(BOB));
    assert_eq!(fx.sink.names_for(Target::User(USER)).await, vec!["ticket_claimed"]);
}

#[tokio::test]
async fn lifecycle_keeps_invariants() {
    let fx = fixture().await;
    let t = fx.open_ticket("imprimante").await;
    let reference = TicketRef::Id(t.id);
    let admin = actor(ALICE);
    assert_invariants(&t);

    assert!(matches!(fx.engine.hold(&admin, &reference).await, Err(TicketError::InvalidState { .. })));
    assert!(matches!(fx.engine.resume(&admin, &reference).await, Err(TicketError::InvalidState { .. })));
    assert_invariants(&fx.engine.claim(&admin, &reference).await.unwrap());
    let held = fx.engine.hold(&admin, &reference).await.unwrap();
    assert_eq!(held.status, TicketStatus::OnHold);
    assert_eq!(held.admin_id, Some(ALICE));
    assert_invariants(&held);
    let resumed = fx.engine.resume(&admin, &reference).await.unwrap();
    assert_eq!(resumed.status, TicketStatus::InProgress);
    assert_invariants(&resumed);
    assert_invariants(&fx.engine.close(&admin, &reference).await.unwrap());
    assert!(fx.engine.claim(&admin, &reference).await.is_err());
    assert!(fx.engine.transfer(&admin, &reference).await.is_err());
    assert_invariants(&fx.reload(t.id).await);
    assert_eq!(
        fx.sink.names_for(Target::User(USER)).await,
        vec!["ticket_claimed", "ticket_on_hold", "ticket_resumed", "ticket_closed"]
    );
}

#[tokio::test]
async fn transfer_returns_ticket_to_queue() {
    let fx = fixture().await;
    let t = fx.open_ticket("accès VPN").await;
    let reference = TicketRef::Id(t.id);
    fx.engine.claim(&actor(ALICE), &reference).await.unwrap();
    fx.engine.hold(&actor(ALICE), &reference).await.unwrap();

    let transferred = fx.engine.transfer(&actor(BOB), &reference).await.unwrap();
    assert_eq!(transferred.status, TicketStatus::New);
    assert_eq!(transferred.admin_id, None);
    assert_eq!(transferred.message_id, Some(1001));
    assert_invariants(&transferred);
    assert_eq!(fx.sink.names_for(Target::SharedChannel).await, vec!["ticket_created", "ticket_transferred"]);

    // Un ticket nouveau peut aussi être rediffusé
    let again = fx.engine.transfer(&actor(BOB), &reference).await.unwrap();
    assert_eq!(again.status, TicketStatus::New);
    let claimed = fx.engine.claim(&actor(BOB), &reference).await.unwrap();
    assert_eq!(claimed.admin_id, Some(BOB));
}

#[tokio::test]
async fn delete_removes_messages_and_never_reuses_numbers() {
    let fx = fixture().await;
    let t = fx.open_ticket("écran noir").await;
    let reference = TicketRef::Id(t.id);
    fx.engine.admin_reply(&actor(ALICE), &reference, "Avez-vous redémarré ?", None).await.unwrap();
    fx.engine.user_reply(&actor(USER), &reference, "Oui", None).await.unwrap();
    assert_eq!(fx.message_count(t.id).await, 3);

    assert_eq!(fx.engine.delete(&actor(ALICE), &reference).await.unwrap(), "#00001");
    assert_eq!(fx.message_count(t.id).await, 0);
    assert!(matches!(fx.engine.delete(&actor(ALICE), &reference).await, Err(TicketError::NotFound(_))));

    let next = fx.open_ticket("clavier").await;
    assert_eq!(next.ticket_number, "#00002");
}

#[tokio::test]
async fn clear_history_keeps_ticket() {
    let fx = fixture().await;
    let t = fx.open_ticket("souris").await;
    let reference = TicketRef::Id(t.id);
    fx.engine.admin_reply(&actor(ALICE), &reference, "Laquelle ?", None).await.unwrap();
    assert_eq!(fx.engine.clear_history(&actor(ALICE), &reference).await.unwrap(), 2);
    let (ticket, messages) = fx.engine.history(&actor(ALICE), &reference).await.unwrap();
    assert_eq!(ticket.id, t.id);
    assert!(messages.is_empty());
}

#[tokio::test]
async fn reminders_fire_on_stale_tickets_only() {
    let fx = fixture().await;
    let old = fx.open_ticket("ancien").await;
    let recent = fx.open_ticket("récent").await;
    fx.backdate(old.id, Duration::minutes(31), Duration::minutes(31)).await;
    fx.backdate(recent.id, Duration::minutes(10), Duration::minutes(10)).await;
    fx.sink.take().await;

    let scheduler = fx.reminders();
    let report = scheduler.sweep(Utc::now()).await.unwrap();
    assert_eq!(report.unclaimed, 1);
    let sent = fx.sink.take().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, Target::SharedChannel);
    assert!(matches!(&sent[0].1, Event::ReminderUnclaimed { ticket } if ticket.id == old.id));

    // Pas de mémoire entre deux passages
    let again = scheduler.sweep(Utc::now()).await.unwrap();
    assert_eq!(again, report);
    assert_eq!(fx.sink.take().await, sent);
}

#[tokio::test]
async fn reminders_for_held_and_in_progress_tickets() {
    let fx = fixture().await;
    let held = fx.open_ticket("en attente").await;
    let busy = fx.open_ticket("en cours").await;
    fx.engine.claim(&actor(ALICE), &TicketRef::Id(held.id)).await.unwrap();
    fx.engine.hold(&actor(ALICE), &TicketRef::Id(held.id)).await.unwrap();
    fx.engine.claim(&actor(BOB), &TicketRef::Id(busy.id)).await.unwrap();
    fx.backdate(held.id, Duration::hours(30), Duration::hours(25)).await;
    fx.backdate(busy.id, Duration::hours(50), Duration::hours(49)).await;
    fx.sink.take().await;

    let report = fx.reminders().sweep(Utc::now()).await.unwrap();
    assert_eq!((report.unclaimed, report.on_hold, report.in_progress), (0, 1, 1));
    assert_eq!(report.sent(), 2);
    assert_eq!(fx.sink.names_for(Target::User(USER)).await, vec!["reminder_on_hold"]);
    assert_eq!(fx.sink.names_for(Target::Admin(BOB)).await, vec!["reminder_in_progress"]);
}

#[tokio::test]
async fn reminder_failures_do_not_stop_the_sweep() {
    let fx = fixture().await;
    for name in ["a", "b", "c"] {
        let t = fx.open_ticket(name).await;
        fx.backdate(t.id, Duration::hours(1), Duration::hours(1)).await;
    }
    fx.sink.set_failing(true);
    let report = fx.reminders().sweep(Utc::now()).await.unwrap();
    assert_eq!(report.unclaimed, 3);
    assert_eq!(report.failed, 3);
    assert_eq!(report.sent(), 0);
}

#[tokio::test]
async fn only_seniors_manage_admins() {
    let fx = fixture().await;
    let before = list_active_admins(&*fx.db).await.unwrap();
    let newcomer = actor(42);

    let denied = fx.engine.add_admin(&actor(ALICE), &newcomer).await;
    assert!(matches!(denied, Err(TicketError::Unauthorized(_))));
    assert_eq!(list_active_admins(&*fx.db).await.unwrap(), before);
    assert!(matches!(fx.engine.list_admins(&actor(ALICE)).await, Err(TicketError::Unauthorized(_))));

    assert_eq!(fx.engine.add_admin(&actor(SENIOR), &newcomer).await.unwrap(), AddAdmin::Created);
    assert_eq!(fx.engine.add_admin(&actor(SENIOR), &newcomer).await.unwrap(), AddAdmin::AlreadyActive);
    assert_eq!(fx.engine.remove_admin(&actor(SENIOR), 42).await.unwrap(), RemoveAdmin::Deactivated);
    assert!(matches!(fx.engine.claim(&newcomer, &by_number("1")).await, Err(TicketError::Unauthorized(_))));
    assert_eq!(fx.engine.add_admin(&actor(SENIOR), &newcomer).await.unwrap(), AddAdmin::Reactivated);
    assert!(matches!(fx.engine.remove_admin(&actor(SENIOR), 77).await, Err(TicketError::AdminNotFound(77))));
    assert_eq!(fx.engine.list_admins(&actor(SENIOR)).await.unwrap().len(), 3);
}

#[tokio::test]
async fn users_cannot_run_admin_actions() {
    let fx = fixture().await;
    let t = fx.open_ticket("wifi").await;
    let user = actor(USER);
    let reference = TicketRef::Id(t.id);
    assert!(matches!(fx.engine.claim(&user, &reference).await, Err(TicketError::Unauthorized(_))));
    assert!(matches!(fx.engine.delete(&user, &reference).await, Err(TicketError::Unauthorized(_))));
    assert!(matches!(fx.engine.stats(&user).await, Err(TicketError::Unauthorized(_))));
    assert!(matches!(fx.engine.list(&user, ListFilter::AllOpen).await, Err(TicketError::Unauthorized(_))));
    assert_eq!(fx.reload(t.id).await.status, TicketStatus::New);
}

#[tokio::test]
async fn reply_prompt_is_single_use() {
    let fx = fixture().await;
    let t = fx.open_ticket("logiciel planté").await;
    fx.sink.take().await;
    let admin = actor(ALICE);
    fx.engine.open_reply_prompt(&admin, &TicketRef::Id(t.id), 500).await.unwrap();

    let first = fx.engine.resolve_channel_reply(&admin, 500, "Quel logiciel ?", None).await.unwrap();
    assert!(matches!(first, ChannelReply::Replied(ref ticket) if ticket.id == t.id));
    let second = fx.engine.resolve_channel_reply(&admin, 500, "Quel logiciel ?", None).await.unwrap();
    assert_eq!(second, ChannelReply::Dropped);

    let sent = fx.sink.take().await;
    assert_eq!(sent.len(), 1);
    assert!(matches!(&sent[0], (Target::User(USER), Event::ReplyReceived { text: Some(text), .. }) if text == "Quel logiciel ?"));
    assert_eq!(fx.message_count(t.id).await, 2);
}

#[tokio::test]
async fn channel_reply_falls_back_to_ticket_message() {
    let fx = fixture().await;
    let t = fx.open_ticket("badge").await;
    let anchor = t.message_id.unwrap();
    let outcome = fx.engine.resolve_channel_reply(&actor(BOB), anchor, "Je regarde", None).await.unwrap();
    assert!(matches!(outcome, ChannelReply::Replied(ref ticket) if ticket.id == t.id));
    let outcome = fx.engine.resolve_channel_reply(&actor(BOB), anchor + 99, "perdu", None).await.unwrap();
    assert_eq!(outcome, ChannelReply::Dropped);
}

#[tokio::test]
async fn edit_prompt_rearms_on_empty_description() {
    let fx = fixture().await;
    let t = fx.open_ticket("descr").await;
    let admin = actor(ALICE);
    fx.engine.open_edit_prompt(&admin, &TicketRef::Id(t.id), 600).await.unwrap();
    assert_eq!(fx.engine.resolve_channel_reply(&admin, 600, "  ", None).await.unwrap(), ChannelReply::PromptRearmed(t.id));
    let updated = fx.engine.resolve_channel_reply(&admin, 600, "Écran qui clignote", None).await.unwrap();
    match updated {
        ChannelReply::DescriptionUpdated(ticket) => assert_eq!(ticket.description, "Écran qui clignote"),
        other => panic!("unexpected {:?}", other),
    }
    assert!(!fx.engine.cancel(&admin).await);
}

#[tokio::test]
async fn cancel_drops_pending_prompts() {
    let fx = fixture().await;
    let t = fx.open_ticket("réseau").await;
    let admin = actor(ALICE);
    fx.engine.open_reply_prompt(&admin, &TicketRef::Id(t.id), 700).await.unwrap();
    assert!(fx.engine.cancel(&admin).await);
    assert_eq!(fx.engine.resolve_channel_reply(&admin, 700, "trop tard", None).await.unwrap(), ChannelReply::Dropped);
}

#[tokio::test]
async fn unknown_reference_is_not_found() {
    let fx = fixture().await;
    fx.open_ticket("un").await;
    let missing = fx.engine.claim(&actor(ALICE), &by_number("00042")).await;
    assert!(matches!(missing, Err(TicketError::NotFound(ref n)) if n == "#00042"));
    // Égalité stricte après normalisation
    assert!(matches!(fx.engine.claim(&actor(ALICE), &by_number("1")).await, Err(TicketError::NotFound(_))));
}

#[tokio::test]
async fn delivery_failure_does_not_block_lifecycle() {
    let fx = fixture().await;
    fx.sink.set_failing(true);
    let t = fx.open_ticket("silence").await;
    assert_eq!(t.message_id, None);
    let claimed = fx.engine.claim(&actor(ALICE), &TicketRef::Id(t.id)).await.unwrap();
    assert_eq!(claimed.status, TicketStatus::InProgress);
    fx.engine.admin_reply(&actor(ALICE), &TicketRef::Id(t.id), "bonjour", None).await.unwrap();
    assert!(fx.sink.take().await.is_empty());
}

#[tokio::test]
async fn user_replies_are_restricted() {
    let fx = fixture().await;
    let t = fx.open_ticket("vpn").await;
    let reference = TicketRef::Id(t.id);
    assert!(matches!(fx.engine.user_reply(&actor(OTHER_USER), &reference, "moi aussi", None).await, Err(TicketError::Unauthorized(_))));
    assert!(matches!(fx.engine.user_reply(&actor(USER), &reference, "   ", None).await, Err(TicketError::Validation(_))));

    fx.sink.take().await;
    fx.engine.user_reply(&actor(USER), &reference, "toujours rien", None).await.unwrap();
    fx.engine.claim(&actor(ALICE), &reference).await.unwrap();
    fx.engine.user_reply(&actor(USER), &reference, "merci", Some("https://cdn/capture.png".to_string())).await.unwrap();
    assert_eq!(fx.sink.names_for(Target::SharedChannel).await, vec!["reply_received"]);
    assert_eq!(fx.sink.names_for(Target::Admin(ALICE)).await, vec!["reply_received"]);

    fx.engine.close(&actor(ALICE), &reference).await.unwrap();
    assert!(matches!(fx.engine.user_reply(&actor(USER), &reference, "encore", None).await, Err(TicketError::InvalidState { .. })));
    assert!(matches!(fx.engine.admin_reply(&actor(ALICE), &reference, "encore", None).await, Err(TicketError::InvalidState { .. })));
}

#[tokio::test]
async fn assignee_only_policy() {
    let strict = fixture_with(TicketPolicy { assignee_only: true }).await;
    let t = strict.open_ticket("strict").await;
    let reference = TicketRef::Id(t.id);
    strict.engine.claim(&actor(ALICE), &reference).await.unwrap();
    assert!(matches!(strict.engine.hold(&actor(BOB), &reference).await, Err(TicketError::Unauthorized(_))));
    assert!(matches!(strict.engine.admin_reply(&actor(BOB), &reference, "je prends", None).await, Err(TicketError::Unauthorized(_))));
    assert!(strict.engine.hold(&actor(SENIOR), &reference).await.is_ok());
    // Fermer et transférer restent ouverts à tous les administrateurs
    assert!(strict.engine.transfer(&actor(BOB), &reference).await.is_ok());

    let loose = fixture().await;
    let t = loose.open_ticket("souple").await;
    let reference = TicketRef::Id(t.id);
    loose.engine.claim(&actor(ALICE), &reference).await.unwrap();
    assert!(loose.engine.hold(&actor(BOB), &reference).await.is_ok());
}

#[tokio::test]
async fn wizard_creates_ticket() {
    let fx = fixture().await;
    let user = actor(USER);
    assert_eq!(fx.engine.start_wizard(&user).await.unwrap(), Step::Category);
    assert!(matches!(fx.engine.wizard_category(&user, "imprimante").await, Err(TicketError::Validation(_))));
    assert_eq!(fx.engine.wizard_category(&user, "network").await.unwrap(), Step::Priority);
    assert_eq!(fx.engine.wizard_priority(&user, "HIGH").await.unwrap(), Step::Description);
    assert_eq!(fx.engine.wizard_description(&user, "VPN down", None).await.unwrap(), Step::Confirm);
    let created = fx.engine.confirm_wizard(&user).await.unwrap();
    assert_eq!((created.category, created.priority), (TicketCategory::Network, TicketPriority::High));
    assert_eq!(created.description, "VPN down");
    assert_eq!(fx.engine.wizard_step(&user).await, None);
    assert!(matches!(fx.engine.confirm_wizard(&user).await, Err(TicketError::Validation(_))));
}

#[tokio::test]
async fn quick_ticket_defaults() {
    let fx = fixture().await;
    assert!(matches!(fx.engine.quick_create(&actor(USER), "  ", None).await, Err(TicketError::Validation(_))));
    let t = fx.engine.quick_create(&actor(USER), "Plus de son", None).await.unwrap();
    assert_eq!((t.category, t.priority), (TicketCategory::Other, TicketPriority::Medium));
}

#[tokio::test]
async fn edits_do_not_change_status() {
    let fx = fixture().await;
    let t = fx.open_ticket("lent").await;
    let reference = TicketRef::Id(t.id);
    let admin = actor(ALICE);
    assert!(matches!(fx.engine.edit_priority(&admin, &reference, "urgent").await, Err(TicketError::Validation(_))));
    let edited = fx.engine.edit_priority(&admin, &reference, "low").await.unwrap();
    assert_eq!(edited.priority, TicketPriority::Low);
    let edited = fx.engine.edit_category(&admin, &reference, "hardware").await.unwrap();
    assert_eq!(edited.category, TicketCategory::Hardware);
    let edited = fx.engine.edit_description(&admin, &reference, "très lent").await.unwrap();
    assert_eq!(edited.description, "très lent");
    assert_eq!(edited.status, TicketStatus::New);
}

#[tokio::test]
async fn listings() {
    let fx = fixture().await;
    for i in 0..12 {
        fx.open_ticket(&format!("ticket {}", i)).await;
    }
    fx.engine.create(&actor(OTHER_USER), TicketCategory::Access, TicketPriority::Low, "autre", None).await.unwrap();
    fx.engine.claim(&actor(ALICE), &by_number("00002")).await.unwrap();
    fx.engine.close(&actor(ALICE), &by_number("00003")).await.unwrap();

    let mine = fx.engine.list(&actor(USER), ListFilter::Mine).await.unwrap();
    assert_eq!(mine.len(), 10);
    assert_eq!(mine[0].ticket_number, "#00012");
    assert!(mine.iter().all(|t| t.user_id == USER));

    let assigned = fx.engine.list(&actor(ALICE), ListFilter::Assigned).await.unwrap();
    assert_eq!(assigned.iter().map(|t| t.ticket_number.as_str()).collect::<Vec<_>>(), vec!["#00002"]);
    assert_eq!(fx.engine.list(&actor(ALICE), ListFilter::AllOpen).await.unwrap().len(), 12);
    assert_eq!(fx.engine.list(&actor(ALICE), ListFilter::ByUser(OTHER_USER)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn status_is_private_to_owner_and_admins() {
    let fx = fixture().await;
    fx.open_ticket("privé").await;
    assert!(fx.engine.status(&actor(USER), &by_number("00001")).await.is_ok());
    assert!(fx.engine.status(&actor(ALICE), &by_number("00001")).await.is_ok());
    assert!(matches!(fx.engine.status(&actor(OTHER_USER), &by_number("00001")).await, Err(TicketError::NotFound(_))));
}

#[tokio::test]
async fn rating_and_stats() {
    let fx = fixture().await;
    let first = fx.open_ticket("un").await;
    fx.engine.create(&actor(USER), TicketCategory::Network, TicketPriority::High, "deux", None).await.unwrap();
    fx.engine.create(&actor(USER), TicketCategory::Network, TicketPriority::High, "trois", None).await.unwrap();
    let reference = TicketRef::Id(first.id);

    assert!(matches!(fx.engine.rate(&actor(USER), &reference, 4).await, Err(TicketError::InvalidState { .. })));
    fx.engine.close(&actor(ALICE), &reference).await.unwrap();
    assert!(matches!(fx.engine.rate(&actor(USER), &reference, 6).await, Err(TicketError::Validation(_))));
    assert!(matches!(fx.engine.rate(&actor(OTHER_USER), &reference, 4).await, Err(TicketError::Unauthorized(_))));
    assert_eq!(fx.engine.rate(&actor(USER), &reference, 4).await.unwrap().rating, Some(4));

    let stats = fx.engine.stats(&actor(ALICE)).await.unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.by_status, vec![(TicketStatus::New, 2), (TicketStatus::Closed, 1)]);
    assert_eq!(stats.by_priority, vec![(TicketPriority::Medium, 1), (TicketPriority::High, 2)]);
    assert_eq!(stats.average_rating, Some(4.0));
}
