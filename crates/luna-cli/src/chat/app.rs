use luna_core::chat::PendingTurn;
use luna_core::{ChatSession, CycleSetup, Reply, SendOutcome, SetupForm, SetupHandler};
use tracing::warn;

use super::types::ChatMsg;

// ── setup form ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum SetupField {
    LastPeriodDate,
    CycleLength,
}

/// The cycle setup popup: raw field text plus which field has focus.
#[derive(Debug, Clone)]
pub(super) struct SetupFormState {
    pub(super) form: SetupForm,
    pub(super) focus: SetupField,
}

impl SetupFormState {
    pub(super) fn new(current: Option<&CycleSetup>) -> Self {
        Self {
            form: current.map(SetupForm::from).unwrap_or_default(),
            focus: SetupField::LastPeriodDate,
        }
    }

    fn field_mut(&mut self) -> &mut String {
        match self.focus {
            SetupField::LastPeriodDate => &mut self.form.last_period_date,
            SetupField::CycleLength => &mut self.form.cycle_length,
        }
    }

    pub(super) fn insert_char(&mut self, c: char) {
        self.field_mut().push(c);
    }

    pub(super) fn backspace(&mut self) {
        self.field_mut().pop();
    }

    pub(super) fn next_field(&mut self) {
        self.focus = match self.focus {
            SetupField::LastPeriodDate => SetupField::CycleLength,
            SetupField::CycleLength => SetupField::LastPeriodDate,
        };
    }
}

// ── app state ────────────────────────────────────────────────────────────────

pub(super) struct App {
    pub(super) session: ChatSession,
    pub(super) chat: Vec<ChatMsg>,
    pub(super) input: String,
    pub(super) cursor: usize,
    pub(super) scroll: u16,
    pub(super) auto_scroll: bool,
    pub(super) history: Vec<String>,
    pub(super) history_idx: Option<usize>,
    pub(super) spin_i: usize,
    pub(super) suggest_idx: Option<usize>, // selected index in suggestion popup
    pub(super) markdown: bool,
    /// Bumped on every accepted message; replies carry the value they started with.
    pub(super) turn: u64,
    pub(super) setup_form: Option<SetupFormState>,
    /// Blocking message box, dismissed with Enter or Esc.
    pub(super) alert: Option<String>,
}

impl App {
    pub(super) fn new(session: ChatSession, markdown: bool) -> Self {
        Self {
            session,
            chat: Vec::new(),
            input: String::new(),
            cursor: 0,
            scroll: 0,
            auto_scroll: true,
            history: Vec::new(),
            history_idx: None,
            spin_i: 0,
            suggest_idx: None,
            markdown,
            turn: 0,
            setup_form: None,
            alert: None,
        }
    }

    pub(super) fn push(&mut self, msg: ChatMsg) {
        self.chat.push(msg);
        if self.auto_scroll {
            self.scroll = u16::MAX;
        }
    }

    pub(super) fn spinning(&self) -> bool {
        self.session.is_loading()
    }

    /// Accept a chat message: `None` while another turn is in flight.
    pub(super) fn begin_turn(&mut self, input: &str) -> Option<(u64, PendingTurn)> {
        let pending = self.session.begin(input)?;
        self.turn += 1;
        self.push(ChatMsg::User(pending.text.clone()));
        Some((self.turn, pending))
    }

    /// Returns false (and drops the reply) when `turn` is not the one in flight.
    pub(super) fn finish_turn(&mut self, turn: u64, reply: Reply) -> bool {
        if turn != self.turn || !self.session.is_loading() {
            return false;
        }
        let outcome = self.session.finish(reply);
        self.push_last_entry(outcome);
        true
    }

    pub(super) fn cancel_turn(&mut self) {
        if self.session.is_loading() {
            self.session.abort("cancelled");
            self.push_last_entry(SendOutcome::Failed);
        }
    }

    fn push_last_entry(&mut self, outcome: SendOutcome) {
        if let Some(entry) = self.session.log().last() {
            let msg = ChatMsg::from_entry(entry, Some(outcome));
            self.push(msg);
        }
    }

    pub(super) fn open_setup_form(&mut self) {
        self.setup_form = Some(SetupFormState::new(self.session.setup()));
    }

    /// Validate and save the open form. On any error the form stays up and
    /// the reason is shown as an alert.
    pub(super) async fn submit_setup(&mut self, handler: &SetupHandler) {
        let Some(state) = self.setup_form.as_ref() else {
            return;
        };
        match handler.complete(&state.form, &mut self.session).await {
            Ok(setup) => {
                self.setup_form = None;
                self.push(ChatMsg::Info(format!(
                    "setup saved: last period {}, {}-day cycle",
                    setup.last_period_date, setup.cycle_length
                )));
            }
            Err(e) => {
                if !e.is_validation() {
                    warn!(error = %e, "cycle setup not saved");
                }
                self.alert = Some(e.to_string());
            }
        }
    }

    pub(super) fn insert_char(&mut self, c: char) {
        self.input.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    pub(super) fn backspace(&mut self) {
        if self.cursor > 0 {
            let i = self.input[..self.cursor]
                .char_indices()
                .last()
                .map(|(i, _)| i)
                .unwrap_or(0);
            self.input.drain(i..self.cursor);
            self.cursor = i;
        }
    }

    pub(super) fn cursor_left(&mut self) {
        if self.cursor > 0 {
            self.cursor = self.input[..self.cursor]
                .char_indices()
                .last()
                .map(|(i, _)| i)
                .unwrap_or(0);
        }
    }

    pub(super) fn cursor_right(&mut self) {
        if self.cursor < self.input.len() {
            let n = self.input[self.cursor..]
                .chars()
                .next()
                .map(|c| c.len_utf8())
                .unwrap_or(0);
            self.cursor += n;
        }
    }
}
