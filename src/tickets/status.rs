//! Machine à états des tickets.
//!
//! ```text
//! new ──claim──▶ in_progress ──close──▶ closed
//!  ▲               │    ▲
//!  │             hold  resume
//!  │               ▼    │
//!  └──transfer── on_hold
//! ```
//! `close` et `transfer` sont possibles depuis tout état non fermé.
//! `closed` est terminal.

use crate::db::{IDType, controller::ticket::Assignment, model::ticket::TicketStatus};

/// Action d'un administrateur sur le statut d'un ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Claim,
    Hold,
    Resume,
    Close,
    Transfer,
}

impl Action {
    pub const ALL: [Action; 5] = [Action::Claim, Action::Hold, Action::Resume, Action::Close, Action::Transfer];

    /// États depuis lesquels l'action est permise
    pub fn allowed_from(self) -> &'static [TicketStatus] {
        use TicketStatus::*;
        match self {
            Action::Claim => &[New],
            Action::Hold => &[InProgress],
            Action::Resume => &[OnHold],
            Action::Close => &[New, InProgress, OnHold],
            Action::Transfer => &[New, InProgress, OnHold],
        }
    }
    pub fn target(self) -> TicketStatus {
        match self {
            Action::Claim | Action::Resume => TicketStatus::InProgress,
            Action::Hold => TicketStatus::OnHold,
            Action::Close => TicketStatus::Closed,
            Action::Transfer => TicketStatus::New,
        }
    }
    /// Effet sur l'administrateur assigné.
    ///
    /// Un assigné n'existe qu'en `in_progress` ou `on_hold`.
    pub fn assignment(self, actor: IDType) -> Assignment {
        match self {
            Action::Claim => Assignment::Assign(actor),
            Action::Hold | Action::Resume => Assignment::Keep,
            Action::Close | Action::Transfer => Assignment::Clear,
        }
    }
    pub fn verb(self) -> &'static str {
        match self {
            Action::Claim => "prendre en charge",
            Action::Hold => "mettre en attente",
            Action::Resume => "reprendre",
            Action::Close => "fermer",
            Action::Transfer => "transférer",
        }
    }
}

impl TicketStatus {
    /// Statut obtenu après `action`, ou `None` si la paire est interdite.
    pub fn apply(self, action: Action) -> Option<TicketStatus> {
        if action.allowed_from().contains(&self) {
            Some(action.target())
        } else {
            None
        }
    }
    pub fn is_terminal(self) -> bool {
        self == TicketStatus::Closed
    }
    /// Statuts considérés comme ouverts
    pub fn open() -> Vec<TicketStatus> {
        vec![TicketStatus::New, TicketStatus::InProgress, TicketStatus::OnHold]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TicketStatus::*;

    #[test]
    fn transition_table() {
        assert_eq!(New.apply(Action::Claim), Some(InProgress));
        assert_eq!(InProgress.apply(Action::Claim), None);
        assert_eq!(InProgress.apply(Action::Hold), Some(OnHold));
        assert_eq!(OnHold.apply(Action::Hold), None);
        assert_eq!(New.apply(Action::Hold), None);
        assert_eq!(OnHold.apply(Action::Resume), Some(InProgress));
        assert_eq!(InProgress.apply(Action::Resume), None);
        assert_eq!(New.apply(Action::Close), Some(Closed));
        assert_eq!(OnHold.apply(Action::Close), Some(Closed));
        assert_eq!(InProgress.apply(Action::Transfer), Some(New));
        assert_eq!(OnHold.apply(Action::Transfer), Some(New));
    }

    #[test]
    fn closed_is_terminal() {
        assert!(Closed.is_terminal());
        for action in Action::ALL {
            assert_eq!(Closed.apply(action), None, "{:?} must not leave closed", action);
        }
    }

    #[test]
    fn assignee_only_while_assigned() {
        assert_eq!(Action::Claim.assignment(7), Assignment::Assign(7));
        assert_eq!(Action::Transfer.assignment(7), Assignment::Clear);
        assert_eq!(Action::Close.assignment(7), Assignment::Clear);
        assert_eq!(Action::Hold.assignment(7), Assignment::Keep);
        for action in Action::ALL {
            if let Assignment::Assign(_) | Assignment::Keep = action.assignment(1) {
                assert!(matches!(action.target(), InProgress | OnHold));
            }
        }
    }
}
