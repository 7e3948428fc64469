/// Long-press save affordance for links on a page.
///
/// The controller owns all interaction state and never touches the DOM. Each
/// event returns the commands the page driver must apply, and timer callbacks
/// come back with the ticket they were armed with so stale ones are ignored.
use crate::api::SaveLinkRequest;
use crate::messages::{Outcome, ToastMessage};
use crate::toast::ToastKind;

pub const LONG_PRESS_MS: u32 = 500;
pub const BUTTON_TIMEOUT_MS: u32 = 5000;

pub const BUTTON_WIDTH: f64 = 100.0;
pub const BUTTON_HEIGHT: f64 = 40.0;
pub const BUTTON_PADDING: f64 = 10.0;

pub const BUTTON_LABEL: &str = "💾 Save";
pub const SAVING_LABEL: &str = "⏳ Saving...";

#[derive(Debug, Clone, PartialEq)]
pub struct LinkTarget {
    pub href: String,
    pub text: String,
}

impl LinkTarget {
    /// `None` for links that cannot be saved (empty, `javascript:`, bare `#`)
    pub fn new(href: &str, text: &str) -> Option<LinkTarget> {
        if href.is_empty() || href.starts_with("javascript:") || href == "#" {
            return None;
        }
        Some(LinkTarget {
            href: href.to_string(),
            text: text.to_string(),
        })
    }

    fn title(&self) -> String {
        match self.text.trim() {
            "" => self.href.clone(),
            text => text.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub left: f64,
    pub top: f64,
}

/// Centre the button above the pointer, kept inside the viewport
pub fn place_button(x: f64, y: f64, viewport: Viewport) -> Position {
    let max_left = viewport.width - BUTTON_WIDTH - BUTTON_PADDING;
    let max_top = viewport.height - BUTTON_HEIGHT - BUTTON_PADDING;

    Position {
        left: (x - BUTTON_WIDTH / 2.0).min(max_left).max(BUTTON_PADDING),
        top: (y - BUTTON_HEIGHT - BUTTON_PADDING).min(max_top).max(BUTTON_PADDING),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AgentState {
    Idle,
    Pressing { ticket: u32, x: f64, y: f64, link: LinkTarget },
    ButtonVisible { ticket: u32, link: LinkTarget },
    Saving { link: LinkTarget },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ArmPressTimer { ticket: u32, delay_ms: u32 },
    CancelPressTimer { ticket: u32 },
    ShowButton { position: Position },
    ArmDismissTimer { ticket: u32, delay_ms: u32 },
    CancelDismissTimer { ticket: u32 },
    MarkSaving,
    RemoveButton,
    SendSaveLink(SaveLinkRequest),
    ShowToast(ToastMessage),
}

pub struct PressController {
    state: AgentState,
    viewport: Viewport,
    next_ticket: u32,
}

impl PressController {
    pub fn new(viewport: Viewport) -> Self {
        PressController {
            state: AgentState::Idle,
            viewport,
            next_ticket: 0,
        }
    }

    pub fn state(&self) -> &AgentState {
        &self.state
    }

    pub fn button_visible(&self) -> bool {
        matches!(self.state, AgentState::ButtonVisible { .. } | AgentState::Saving { .. })
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    fn ticket(&mut self) -> u32 {
        self.next_ticket = self.next_ticket.wrapping_add(1);
        self.next_ticket
    }

    /// Mouse-down (primary button) or touch-start. `link` is the saveable link
    /// under the pointer, if any.
    pub fn pointer_down(&mut self, x: f64, y: f64, link: Option<LinkTarget>) -> Vec<Command> {
        let Some(link) = link else {
            return Vec::new();
        };

        let mut commands = match &self.state {
            AgentState::Saving { .. } => return Vec::new(),
            AgentState::Pressing { ticket, .. } => vec![Command::CancelPressTimer { ticket: *ticket }],
            AgentState::ButtonVisible { ticket, .. } => {
                vec![Command::CancelDismissTimer { ticket: *ticket }, Command::RemoveButton]
            }
            AgentState::Idle => Vec::new(),
        };

        let ticket = self.ticket();
        self.state = AgentState::Pressing { ticket, x, y, link };
        commands.push(Command::ArmPressTimer {
            ticket,
            delay_ms: LONG_PRESS_MS,
        });
        commands
    }

    /// Pointer move, up or cancel. Aborts a press that has not fired yet.
    pub fn pointer_released(&mut self) -> Vec<Command> {
        match self.state {
            AgentState::Pressing { ticket, .. } => {
                self.state = AgentState::Idle;
                vec![Command::CancelPressTimer { ticket }]
            }
            _ => Vec::new(),
        }
    }

    pub fn press_timer_fired(&mut self, fired: u32) -> Vec<Command> {
        let (x, y, link) = match &self.state {
            AgentState::Pressing { ticket, x, y, link } if *ticket == fired => (*x, *y, link.clone()),
            _ => return Vec::new(),
        };

        let position = place_button(x, y, self.viewport);
        let ticket = self.ticket();
        self.state = AgentState::ButtonVisible { ticket, link };
        vec![
            Command::ShowButton { position },
            Command::ArmDismissTimer {
                ticket,
                delay_ms: BUTTON_TIMEOUT_MS,
            },
        ]
    }

    pub fn dismiss_timer_fired(&mut self, fired: u32) -> Vec<Command> {
        match self.state {
            AgentState::ButtonVisible { ticket, .. } if ticket == fired => {
                self.state = AgentState::Idle;
                vec![Command::RemoveButton]
            }
            _ => Vec::new(),
        }
    }

    /// Any click on the document. Clicks outside the button dismiss it.
    pub fn document_click(&mut self, on_button: bool) -> Vec<Command> {
        match self.state {
            AgentState::ButtonVisible { ticket, .. } if !on_button => {
                self.state = AgentState::Idle;
                vec![Command::CancelDismissTimer { ticket }, Command::RemoveButton]
            }
            _ => Vec::new(),
        }
    }

    /// The button was clicked. Only the first activation sends anything.
    pub fn activate(&mut self, page_url: &str) -> Vec<Command> {
        let (dismiss, link) = match &self.state {
            AgentState::ButtonVisible { ticket, link } => (*ticket, link.clone()),
            _ => return Vec::new(),
        };

        let request = SaveLinkRequest {
            url: link.href.clone(),
            title: link.title(),
            page: page_url.to_string(),
            note: None,
            tags: None,
        };
        self.state = AgentState::Saving { link };
        vec![
            Command::MarkSaving,
            Command::SendSaveLink(request),
            Command::CancelDismissTimer { ticket: dismiss },
        ]
    }

    /// The background answered (or the message failed). Always ends in `Idle`.
    pub fn save_finished(&mut self, result: Result<Outcome, String>) -> Vec<Command> {
        let toast = match result {
            Ok(outcome) if outcome.success => ToastMessage::new("Link saved! ✨", ToastKind::Success),
            Ok(outcome) => ToastMessage::new(
                outcome
                    .error
                    .filter(|e| !e.is_empty())
                    .unwrap_or_else(|| "Failed to save link".to_string()),
                ToastKind::Error,
            ),
            Err(e) => {
                log::error!("Save error: {}", e);
                ToastMessage::new("Failed to save link", ToastKind::Error)
            }
        };

        self.state = AgentState::Idle;
        vec![Command::ShowToast(toast), Command::RemoveButton]
    }
}
