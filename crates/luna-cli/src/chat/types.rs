use luna_core::{ChatMessage, CyclePhaseResult, Reply, SendOutcome, Sender};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

use super::markdown::markdown_lines;

// ── chat message types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum ChatMsg {
    User(String),
    Assistant(String),
    Info(String),
    Error(String),
}

impl ChatMsg {
    /// Display form of a transcript entry. Failed turns get the error badge
    /// instead of repeating the `Error: ` prefix.
    pub(super) fn from_entry(entry: &ChatMessage, outcome: Option<SendOutcome>) -> Self {
        match (entry.sender, outcome) {
            (Sender::User, _) => ChatMsg::User(entry.text.clone()),
            (Sender::Assistant, Some(SendOutcome::Failed)) => ChatMsg::Error(
                entry
                    .text
                    .strip_prefix("Error: ")
                    .unwrap_or(&entry.text)
                    .to_string(),
            ),
            (Sender::Assistant, _) => ChatMsg::Assistant(entry.text.clone()),
        }
    }

    pub(super) fn to_lines(&self, markdown: bool) -> Vec<Line<'static>> {
        match self {
            ChatMsg::User(t) => vec![
                Line::from(vec![
                    Span::styled(
                        " you ",
                        Style::default()
                            .fg(Color::Black)
                            .bg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::raw("  "),
                    Span::styled(t.clone(), Style::default().fg(Color::Cyan)),
                ]),
                Line::raw(""),
            ],
            ChatMsg::Assistant(t) => {
                let mut lines = vec![Line::from(Span::styled(
                    " luna ",
                    Style::default()
                        .fg(Color::Black)
                        .bg(LUNA_PURPLE)
                        .add_modifier(Modifier::BOLD),
                ))];
                if markdown {
                    lines.extend(markdown_lines(t, "  "));
                } else {
                    for l in t.lines() {
                        lines.push(Line::from(Span::styled(
                            format!("  {l}"),
                            Style::default().fg(Color::White),
                        )));
                    }
                }
                lines.push(Line::raw(""));
                lines
            }
            ChatMsg::Info(t) => vec![
                Line::from(Span::styled(
                    format!("  {t}"),
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::ITALIC),
                )),
                Line::raw(""),
            ],
            ChatMsg::Error(t) => vec![
                Line::from(vec![
                    Span::styled(" error ", Style::default().fg(Color::White).bg(Color::Red)),
                    Span::raw("  "),
                    Span::styled(t.clone(), Style::default().fg(Color::Red)),
                ]),
                Line::raw(""),
            ],
        }
    }
}

pub(super) const LUNA_PURPLE: Color = Color::Rgb(186, 104, 200);

// ── display events from background tasks ─────────────────────────────────────

pub(super) enum DisplayEvent {
    /// A chat turn finished. `turn` guards against replies from a cancelled turn.
    TurnDone { turn: u64, reply: Reply },
    /// Answer to `/phase`.
    Phase {
        result: Result<CyclePhaseResult, String>,
        cycle_length: u32,
    },
}

pub(super) struct InfoBar {
    pub(super) model: String,
    pub(super) service: String,
}
