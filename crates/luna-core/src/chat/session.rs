use serde::{Deserialize, Serialize};

use crate::cycle::CycleSetup;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub text: String,
    pub sender: Sender,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::User,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::Assistant,
        }
    }
}

/// Ordered, append-only transcript. Entries are never edited or removed.
#[derive(Debug, Clone, Default)]
pub struct ChatLog {
    entries: Vec<ChatMessage>,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.entries.push(message);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.entries.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.entries.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    Sending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Replied,
    NeedsSetup,
    Failed,
}

/// The assistant entry that ends a turn, and how the turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub message: ChatMessage,
    pub outcome: SendOutcome,
}

impl Reply {
    pub fn replied(text: impl Into<String>) -> Self {
        Self {
            message: ChatMessage::assistant(text),
            outcome: SendOutcome::Replied,
        }
    }

    pub fn needs_setup() -> Self {
        Self {
            message: ChatMessage::assistant(NEEDS_SETUP_REPLY),
            outcome: SendOutcome::NeedsSetup,
        }
    }

    /// `Error: ` followed by the failure text.
    pub fn failed(reason: impl std::fmt::Display) -> Self {
        Self {
            message: ChatMessage::assistant(format!("Error: {reason}")),
            outcome: SendOutcome::Failed,
        }
    }
}

pub const NEEDS_SETUP_REPLY: &str =
    "Please complete your cycle setup first (last period date and cycle length) so I can tailor my answers to where you are in your cycle.";

/// A message accepted by `ChatSession::begin`, waiting for its reply.
#[derive(Debug, Clone)]
pub struct PendingTurn {
    pub text: String,
    pub setup: Option<CycleSetup>,
}

/// Per-conversation state: the cycle setup, the transcript and whether a
/// turn is in flight. The loading indicator is shown exactly while
/// `state() == FlowState::Sending`.
#[derive(Debug)]
pub struct ChatSession {
    setup: Option<CycleSetup>,
    log: ChatLog,
    state: FlowState,
}

impl ChatSession {
    pub fn new(setup: Option<CycleSetup>) -> Self {
        Self {
            setup,
            log: ChatLog::new(),
            state: FlowState::Idle,
        }
    }

    pub fn setup(&self) -> Option<&CycleSetup> {
        self.setup.as_ref()
    }

    pub fn install_setup(&mut self, setup: CycleSetup) {
        self.setup = Some(setup);
    }

    pub fn clear_setup(&mut self) {
        self.setup = None;
    }

    pub fn log(&self) -> &ChatLog {
        &self.log
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == FlowState::Sending
    }

    /// Idle -> Sending. Returns `None` (and changes nothing) for blank input
    /// or while another turn is in flight.
    pub fn begin(&mut self, input: &str) -> Option<PendingTurn> {
        let text = input.trim();
        if text.is_empty() || self.state == FlowState::Sending {
            return None;
        }
        self.log.push(ChatMessage::user(text));
        self.state = FlowState::Sending;
        Some(PendingTurn {
            text: text.to_string(),
            setup: self.setup.clone(),
        })
    }

    /// Sending -> Idle, appending the assistant entry. Always hides the
    /// loading indicator.
    pub fn finish(&mut self, reply: Reply) -> SendOutcome {
        self.log.push(reply.message);
        self.state = FlowState::Idle;
        reply.outcome
    }

    /// Ends an in-flight turn that will never produce a reply. No-op when idle.
    pub fn abort(&mut self, reason: &str) {
        if self.state == FlowState::Sending {
            self.finish(Reply::failed(reason));
        }
    }

    /// Start a new transcript. Refused while a turn is in flight.
    pub fn reset_log(&mut self) -> bool {
        if self.state == FlowState::Sending {
            return false;
        }
        self.log = ChatLog::new();
        true
    }
}
