/// Transient on-page notifications
use serde::{Deserialize, Serialize};

pub const TOAST_DURATION_MS: u32 = 3000;
pub const TOAST_FADE_MS: u32 = 300;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
    #[default]
    Info,
}

impl ToastKind {
    pub fn class_name(&self) -> &'static str {
        match self {
            ToastKind::Success => "success",
            ToastKind::Error => "error",
            ToastKind::Info => "info",
        }
    }
}

/// Tracks which toast is on the page. At most one at a time.
#[derive(Debug, Default)]
pub struct ToastController {
    next_ticket: u32,
    current: Option<u32>,
}

impl ToastController {
    pub fn new() -> Self {
        ToastController::default()
    }

    /// Register a new toast, replacing the current one.
    /// Returns `(ticket, replaced)` where `replaced` is the ticket to remove now.
    pub fn show(&mut self) -> (u32, Option<u32>) {
        self.next_ticket = self.next_ticket.wrapping_add(1);
        let replaced = self.current.replace(self.next_ticket);
        (self.next_ticket, replaced)
    }

    /// The fade for `ticket` finished. Returns true if it was still the current toast.
    pub fn finish(&mut self, ticket: u32) -> bool {
        if self.current == Some(ticket) {
            self.current = None;
            true
        } else {
            false
        }
    }

    pub fn current(&self) -> Option<u32> {
        self.current
    }
}
