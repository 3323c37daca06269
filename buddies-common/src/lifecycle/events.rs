use std::fmt;
use std::time::SystemTime;
use uuid::Uuid;

use crate::models::buddy_request::BuddyRequest;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum BuddyEventKind {
    Submitted,
    Approved,
    Rejected,
    CancelRequested,
    CancelConfirmed,
    CancelDeclined,
    Withdrawn,
    /// A lapsed request closed as cancelled when its joiner submitted a new one
    Lapsed,
}

impl BuddyEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BuddyEventKind::Submitted => "submitted",
            BuddyEventKind::Approved => "approved",
            BuddyEventKind::Rejected => "rejected",
            BuddyEventKind::CancelRequested => "cancel_requested",
            BuddyEventKind::CancelConfirmed => "cancel_confirmed",
            BuddyEventKind::CancelDeclined => "cancel_declined",
            BuddyEventKind::Withdrawn => "withdrawn",
            BuddyEventKind::Lapsed => "lapsed",
        }
    }
}

impl fmt::Display for BuddyEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Published after every transition that changed a stored record. `request` is the record
/// as written.
#[derive(Clone, Debug)]
pub struct BuddyEvent {
    pub kind: BuddyEventKind,
    pub request: BuddyRequest,
    pub actor_id: Uuid,
    pub at: SystemTime,
}

impl fmt::Display for BuddyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Buddy request {} {} by {} (joiner {}, receiver {}, status {})",
            self.request.id,
            self.kind,
            self.actor_id,
            self.request.joiner_id,
            self.request.receiver_id,
            self.request.status,
        )
    }
}
