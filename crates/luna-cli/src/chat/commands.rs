use luna_core::{CyclePhaseResult, SetupHandler};
use tracing::warn;

use super::app::App;
use super::types::ChatMsg;

// ── constants ────────────────────────────────────────────────────────────────

pub(super) const SLASH_COMMANDS: &[(&str, &str)] = &[
    ("/setup", "update your cycle details  usage: /setup [reset]"),
    ("/phase", "show where you are in your cycle today"),
    ("/clear", "clear the conversation"),
    ("/help", "list commands"),
    ("/quit", "exit Luna"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Command {
    Setup,
    SetupReset,
    Phase,
    Clear,
    Help,
    Quit,
    Unknown(String),
}

/// `None` for ordinary chat text.
pub(super) fn parse_command(input: &str) -> Option<Command> {
    let input = input.trim();
    if !input.starts_with('/') {
        return None;
    }
    let mut parts = input.split_whitespace();
    let cmd = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();
    Some(match (cmd, args.as_slice()) {
        ("/setup", []) => Command::Setup,
        ("/setup", ["reset"]) => Command::SetupReset,
        ("/phase", []) => Command::Phase,
        ("/clear", []) => Command::Clear,
        ("/help", []) => Command::Help,
        ("/quit", []) | ("/exit", []) => Command::Quit,
        _ => Command::Unknown(input.to_string()),
    })
}

pub(super) fn slash_suggestions(prefix: &str) -> Vec<(&'static str, &'static str)> {
    SLASH_COMMANDS
        .iter()
        .filter(|(cmd, _)| cmd.starts_with(prefix))
        .copied()
        .collect()
}

pub(super) fn cmd_help(app: &mut App) {
    app.push(ChatMsg::Info("commands:".into()));
    for (cmd, desc) in SLASH_COMMANDS {
        app.push(ChatMsg::Info(format!("  {cmd:<8}  {desc}")));
    }
    app.push(ChatMsg::Info(
        "ctrl+c cancels a pending reply, or quits when idle".into(),
    ));
}

pub(super) fn cmd_clear(app: &mut App) {
    if app.session.reset_log() {
        app.chat.clear();
        app.scroll = 0;
        app.auto_scroll = true;
    } else {
        app.push(ChatMsg::Error("wait for the current reply first".into()));
    }
}

/// Forget the stored setup and reopen the form.
pub(super) async fn cmd_setup_reset(app: &mut App, handler: &SetupHandler) {
    if let Err(e) = handler.clear().await {
        warn!(error = %format!("{e:#}"), "failed to clear stored setup");
        app.push(ChatMsg::Error(format!("could not clear setup: {e}")));
        return;
    }
    app.session.clear_setup();
    app.push(ChatMsg::Info("setup cleared".into()));
    app.open_setup_form();
}

pub(super) fn phase_summary(result: &CyclePhaseResult, cycle_length: u32) -> Vec<String> {
    let day = result
        .cycle_day
        .map(|d| d.to_string())
        .unwrap_or_else(|| "?".into());
    let phase = result.phase.as_deref().unwrap_or("unknown phase");
    let mut lines = vec![format!("day {day} of {cycle_length}  ·  {phase}")];
    if let Some(desc) = result.phase_description.as_deref() {
        lines.push(desc.to_string());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_commands() {
        assert_eq!(parse_command("/setup"), Some(Command::Setup));
        assert_eq!(parse_command(" /setup  reset "), Some(Command::SetupReset));
        assert_eq!(parse_command("/phase"), Some(Command::Phase));
        assert_eq!(parse_command("/clear"), Some(Command::Clear));
        assert_eq!(parse_command("/help"), Some(Command::Help));
        assert_eq!(parse_command("/quit"), Some(Command::Quit));
        assert_eq!(parse_command("/exit"), Some(Command::Quit));
    }

    #[test]
    fn chat_text_is_not_a_command() {
        assert_eq!(parse_command("I feel crampy today"), None);
        assert_eq!(parse_command("is 3/4 days normal?"), None);
    }

    #[test]
    fn unknown_or_extra_args_are_reported() {
        assert_eq!(
            parse_command("/setup later"),
            Some(Command::Unknown("/setup later".into()))
        );
        assert_eq!(parse_command("/models"), Some(Command::Unknown("/models".into())));
    }

    #[test]
    fn suggestions_filter_by_prefix() {
        let names: Vec<_> = slash_suggestions("/").iter().map(|(c, _)| *c).collect();
        assert_eq!(names.len(), SLASH_COMMANDS.len());
        assert_eq!(slash_suggestions("/p")[0].0, "/phase");
        assert!(slash_suggestions("/zzz").is_empty());
    }

    #[test]
    fn phase_summary_lists_day_phase_and_description() {
        let result = CyclePhaseResult {
            success: true,
            cycle_day: Some(14),
            phase: Some("Ovulatory Phase".into()),
            phase_description: Some("Energy peaks.".into()),
            error: None,
        };
        assert_eq!(
            phase_summary(&result, 28),
            vec!["day 14 of 28  ·  Ovulatory Phase", "Energy peaks."]
        );
    }

    #[tokio::test]
    async fn setup_reset_clears_session_and_reopens_form() {
        use luna_core::{ChatSession, CycleSetup, InMemoryStore};
        use std::sync::Arc;

        let handler = SetupHandler::new(Arc::new(InMemoryStore::new()));
        let mut app = App::new(
            ChatSession::new(Some(CycleSetup {
                last_period_date: "2025-01-01".into(),
                cycle_length: 28,
            })),
            false,
        );

        cmd_setup_reset(&mut app, &handler).await;

        assert!(app.session.setup().is_none());
        assert!(app.setup_form.is_some());
        assert_eq!(app.setup_form.unwrap().form.last_period_date, "");
    }
}
