use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use luna_core::{
    CompletionProvider, Credentials, CyclePhaseFetcher, HttpCycleFetcher, KeyValueStore,
    LunaConfig, MessageFlow, OpenRouterProvider, Reply, SetupHandler,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinError};
use tracing::{info, warn};

use super::app::App;
use super::commands::{
    cmd_clear, cmd_help, cmd_setup_reset, parse_command, phase_summary, slash_suggestions, Command,
};
use super::render::{render, show_splash};
use super::types::{ChatMsg, DisplayEvent, InfoBar};

pub struct RunOptions {
    pub markdown: bool,
    pub reset_setup: bool,
}

/// Everything a key press may need besides the app state.
struct Ctx {
    flow: Arc<MessageFlow>,
    fetcher: Arc<dyn CyclePhaseFetcher>,
    handler: SetupHandler,
    tx: mpsc::Sender<DisplayEvent>,
}

enum Step {
    Continue,
    Quit,
}

// ── main entry ───────────────────────────────────────────────────────────────

pub async fn run(
    config: LunaConfig,
    creds: Credentials,
    store: Arc<dyn KeyValueStore>,
    opts: RunOptions,
) -> Result<()> {
    let fetcher: Arc<dyn CyclePhaseFetcher> = Arc::new(HttpCycleFetcher::new(
        config.cycle_service_url.clone(),
        config.request_timeout(),
    ));
    let provider: Arc<dyn CompletionProvider> =
        Arc::new(OpenRouterProvider::from_config(&config, &creds));
    let flow = Arc::new(MessageFlow::new(Arc::clone(&fetcher), provider));
    let handler = SetupHandler::new(store);

    if opts.reset_setup {
        handler.clear().await?;
        info!("stored cycle setup cleared");
    }
    let setup = match handler.restore().await {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %format!("{e:#}"), "could not restore cycle setup");
            None
        }
    };

    let info = InfoBar {
        model: flow.model().to_string(),
        service: config.cycle_service_url.clone(),
    };

    // Restore the terminal on panic, otherwise the shell is left in raw mode.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));

    enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    terminal.clear()?;

    // Keyboard reader thread (needed for splash too)
    let (key_tx, mut key_rx) = mpsc::channel::<Event>(32);
    tokio::task::spawn_blocking(move || loop {
        if event::poll(Duration::from_millis(100)).unwrap_or(false) {
            if let Ok(ev) = event::read() {
                if key_tx.blocking_send(ev).is_err() {
                    break;
                }
            }
        }
    });

    show_splash(&mut terminal, &mut key_rx, &info.model).await?;

    let mut app = App::new(luna_core::ChatSession::new(setup), opts.markdown);
    app.push(ChatMsg::Info("type a message, or /help for commands".into()));
    if app.session.setup().is_none() {
        app.open_setup_form();
    }

    let (tx, mut event_rx) = mpsc::channel::<DisplayEvent>(16);
    let ctx = Ctx {
        flow,
        fetcher,
        handler,
        tx,
    };
    let mut turn_handle: Option<AbortHandle> = None;

    loop {
        terminal.draw(|f| render(&mut app, &info, f))?;

        tokio::select! {
            // ── keyboard ──
            key = key_rx.recv() => {
                let Some(ev) = key else { break };
                let Event::Key(key) = ev else { continue };
                if key.kind != KeyEventKind::Press { continue; }

                // Ctrl+C: cancel turn if running, quit if idle
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    if app.spinning() {
                        if let Some(h) = turn_handle.take() { h.abort(); }
                        app.cancel_turn();
                        info!("turn cancelled");
                        continue;
                    }
                    break;
                }

                if let Step::Quit = handle_key(&mut app, &ctx, &mut turn_handle, key).await {
                    break;
                }
            }

            // ── background results ──
            Some(ev) = event_rx.recv() => {
                match ev {
                    DisplayEvent::TurnDone { turn, reply } => {
                        if app.finish_turn(turn, reply) {
                            turn_handle = None;
                            if app.session.setup().is_none() && app.setup_form.is_none() {
                                app.open_setup_form();
                            }
                        }
                    }
                    DisplayEvent::Phase { result: Ok(result), cycle_length } => {
                        for line in phase_summary(&result, cycle_length) {
                            app.push(ChatMsg::Info(line));
                        }
                    }
                    DisplayEvent::Phase { result: Err(e), .. } => {
                        app.push(ChatMsg::Error(e));
                    }
                }
            }

            // ── spinner tick ──
            _ = tokio::time::sleep(Duration::from_millis(80)) => {
                if app.spinning() { app.spin_i += 1; }
            }
        }
    }

    if let Some(h) = turn_handle.take() {
        h.abort();
    }
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
    Ok(())
}

async fn handle_key(
    app: &mut App,
    ctx: &Ctx,
    turn_handle: &mut Option<AbortHandle>,
    key: KeyEvent,
) -> Step {
    // ── alert: blocks everything until dismissed ──
    if app.alert.is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
            app.alert = None;
        }
        return Step::Continue;
    }

    // ── setup form ──
    if let Some(form) = app.setup_form.as_mut() {
        match key.code {
            KeyCode::Esc => {
                app.setup_form = None;
                if app.session.setup().is_none() {
                    app.push(ChatMsg::Info(
                        "no cycle setup yet; use /setup when you're ready".into(),
                    ));
                }
            }
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => form.next_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => app.submit_setup(&ctx.handler).await,
            KeyCode::Char(c) => form.insert_char(c),
            _ => {}
        }
        return Step::Continue;
    }

    let busy = app.spinning();

    match key.code {
        KeyCode::Up if !busy && app.input.starts_with('/') => {
            let len = slash_suggestions(&app.input).len();
            if len > 0 {
                app.suggest_idx = Some(match app.suggest_idx {
                    None | Some(0) => len - 1,
                    Some(i) => i - 1,
                });
            }
        }
        KeyCode::Down if !busy && app.input.starts_with('/') => {
            let len = slash_suggestions(&app.input).len();
            if len > 0 {
                app.suggest_idx = Some(match app.suggest_idx {
                    None => 0,
                    Some(i) => (i + 1) % len,
                });
            }
        }
        KeyCode::Up => {
            app.auto_scroll = false;
            app.scroll = app.scroll.saturating_sub(3);
        }
        KeyCode::Down => {
            app.scroll = app.scroll.saturating_add(3);
            if app.scroll == u16::MAX { app.auto_scroll = true; }
        }
        KeyCode::PageUp => {
            app.auto_scroll = false;
            app.scroll = app.scroll.saturating_sub(10);
        }
        KeyCode::PageDown => {
            app.scroll = app.scroll.saturating_add(10);
        }
        // Tab: autocomplete selected suggestion
        KeyCode::Tab => {
            let suggestions = slash_suggestions(&app.input);
            if app.input.starts_with('/') && !suggestions.is_empty() {
                let idx = app.suggest_idx.unwrap_or(0).min(suggestions.len() - 1);
                app.input = suggestions[idx].0.to_string();
                app.cursor = app.input.len();
                app.suggest_idx = None;
            }
        }
        KeyCode::Esc => app.suggest_idx = None,
        KeyCode::Left => { app.suggest_idx = None; app.cursor_left(); }
        KeyCode::Right => { app.suggest_idx = None; app.cursor_right(); }
        KeyCode::Char('a') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.cursor = 0;
        }
        KeyCode::Char('e') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.cursor = app.input.len();
        }
        KeyCode::Backspace => { app.suggest_idx = None; app.backspace(); }

        // History: Ctrl+P / Ctrl+N
        KeyCode::Char('p') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            if !app.history.is_empty() {
                let idx = app.history_idx
                    .map(|i| i.saturating_sub(1))
                    .unwrap_or(app.history.len() - 1);
                app.history_idx = Some(idx);
                app.input = app.history[idx].clone();
                app.cursor = app.input.len();
            }
        }
        KeyCode::Char('n') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            if let Some(idx) = app.history_idx {
                if idx + 1 < app.history.len() {
                    app.history_idx = Some(idx + 1);
                    app.input = app.history[idx + 1].clone();
                } else {
                    app.history_idx = None;
                    app.input.clear();
                }
                app.cursor = app.input.len();
            }
        }

        KeyCode::Enter => {
            // If a slash suggestion is selected, complete it instead of submitting
            if let Some(idx) = app.suggest_idx.take() {
                let suggestions = slash_suggestions(&app.input);
                if let Some((cmd, _)) = suggestions.get(idx) {
                    app.input = cmd.to_string();
                    app.cursor = app.input.len();
                    return Step::Continue;
                }
            }
            return submit(app, ctx, turn_handle).await;
        }

        KeyCode::Char(c) => { app.suggest_idx = None; app.insert_char(c); }
        _ => {}
    }
    Step::Continue
}

async fn submit(
    app: &mut App,
    ctx: &Ctx,
    turn_handle: &mut Option<AbortHandle>,
) -> Step {
    let input = app.input.trim().to_string();
    if input.is_empty() {
        return Step::Continue;
    }
    let command = parse_command(&input);

    // Only /quit gets through while a reply is pending; the text stays in the box.
    if app.spinning() && command != Some(Command::Quit) {
        return Step::Continue;
    }

    app.history.push(input.clone());
    app.history_idx = None;
    app.input.clear();
    app.cursor = 0;
    app.auto_scroll = true;
    app.scroll = u16::MAX;

    match command {
        Some(Command::Quit) => return Step::Quit,
        Some(Command::Setup) => app.open_setup_form(),
        Some(Command::SetupReset) => cmd_setup_reset(app, &ctx.handler).await,
        Some(Command::Clear) => cmd_clear(app),
        Some(Command::Help) => cmd_help(app),
        Some(Command::Phase) => match app.session.setup().cloned() {
            None => app.push(ChatMsg::Info("no cycle setup yet; use /setup first".into())),
            Some(setup) => {
                let fetcher = Arc::clone(&ctx.fetcher);
                let tx = ctx.tx.clone();
                tokio::spawn(async move {
                    let today = chrono::Local::now().date_naive();
                    let result = fetcher
                        .fetch(&setup, today)
                        .await
                        .map_err(|e| e.to_string());
                    let _ = tx
                        .send(DisplayEvent::Phase {
                            result,
                            cycle_length: setup.cycle_length,
                        })
                        .await;
                });
            }
        },
        Some(Command::Unknown(cmd)) => {
            app.push(ChatMsg::Error(format!("unknown command '{cmd}', try /help")));
        }
        None => {
            if let Some((turn, pending)) = app.begin_turn(&input) {
                let flow = Arc::clone(&ctx.flow);
                let tx = ctx.tx.clone();
                let task = tokio::spawn(async move {
                    flow.respond(pending.setup.as_ref(), &pending.text).await
                });
                *turn_handle = Some(task.abort_handle());
                // Watches the turn so a panic or abort still ends it.
                tokio::spawn(async move {
                    let reply = settle_turn(turn, task.await);
                    let _ = tx.send(DisplayEvent::TurnDone { turn, reply }).await;
                });
            }
        }
    }
    Step::Continue
}

/// Reply for a finished turn task. A panicked or aborted task still ends the
/// turn with an error entry.
fn settle_turn(turn: u64, joined: Result<Reply, JoinError>) -> Reply {
    match joined {
        Ok(reply) => reply,
        Err(e) if e.is_cancelled() => Reply::failed("cancelled"),
        Err(e) => {
            warn!(turn, error = %e, "turn task panicked");
            Reply::failed("something went wrong while preparing a reply")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use luna_core::SendOutcome;

    #[tokio::test]
    async fn finished_task_passes_reply_through() {
        let joined = tokio::spawn(async { Reply::replied("hello") }).await;
        assert_eq!(settle_turn(1, joined), Reply::replied("hello"));
    }

    #[tokio::test]
    async fn panicked_task_becomes_error_reply() {
        let joined = tokio::spawn(async {
            if true {
                panic!("flow blew up");
            }
            Reply::replied("unreachable")
        })
        .await;

        let reply = settle_turn(1, joined);
        assert_eq!(reply.outcome, SendOutcome::Failed);
        assert!(reply.message.text.starts_with("Error: "));
    }

    #[tokio::test]
    async fn panicked_turn_hides_spinner() {
        let mut app = App::new(luna_core::ChatSession::new(None), false);
        let (turn, _) = app.begin_turn("hi").unwrap();

        let joined = tokio::spawn(async {
            if true {
                panic!("boom");
            }
            Reply::replied("unreachable")
        })
        .await;
        assert!(app.finish_turn(turn, settle_turn(turn, joined)));

        assert!(!app.spinning());
        assert!(matches!(app.chat.last(), Some(ChatMsg::Error(_))));
    }

    #[tokio::test]
    async fn aborted_task_reads_as_cancelled() {
        let task = tokio::spawn(std::future::pending::<Reply>());
        task.abort();
        assert_eq!(settle_turn(1, task.await), Reply::failed("cancelled"));
    }
}
