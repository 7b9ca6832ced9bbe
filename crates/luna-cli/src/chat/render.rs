use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{Event, KeyEventKind};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc;

use super::app::{App, SetupField, SetupFormState};
use super::commands::slash_suggestions;
use super::types::{InfoBar, LUNA_PURPLE};

pub(super) const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub(super) const LOGO: &[&str] = &[
    "██╗     ██╗   ██╗███╗   ██╗ █████╗ ",
    "██║     ██║   ██║████╗  ██║██╔══██╗",
    "██║     ██║   ██║██╔██╗ ██║███████║",
    "██║     ██║   ██║██║╚██╗██║██╔══██║",
    "███████╗╚██████╔╝██║ ╚████║██║  ██║",
    "╚══════╝ ╚═════╝ ╚═╝  ╚═══╝╚═╝  ╚═╝",
];

fn centered(area: Rect, w: u16, h: u16) -> Rect {
    let w = w.min(area.width);
    let h = h.min(area.height);
    Rect::new(
        area.x + (area.width - w) / 2,
        area.y + (area.height - h) / 2,
        w,
        h,
    )
}

pub(super) fn render(app: &mut App, info: &InfoBar, frame: &mut Frame) {
    let area = frame.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // info box
            Constraint::Min(1),    // chat
            Constraint::Length(3), // input
        ])
        .split(area);

    // ── info box ──────────────────────────────────────────────────────────────
    let label = Style::default().fg(Color::DarkGray);
    let value = Style::default()
        .fg(Color::White)
        .add_modifier(Modifier::BOLD);
    let setup_spans = match app.session.setup() {
        Some(s) => vec![
            Span::styled(s.last_period_date.clone(), value),
            Span::styled("   cycle  ", label),
            Span::styled(format!("{} days", s.cycle_length), value),
        ],
        None => vec![Span::styled(
            "not set  (/setup)",
            Style::default().fg(Color::Yellow),
        )],
    };
    let info_lines = vec![
        Line::from(vec![
            Span::styled("  model    ", label),
            Span::styled(info.model.as_str(), value),
        ]),
        Line::from(vec![
            Span::styled("  service  ", label),
            Span::styled(info.service.as_str(), Style::default().fg(Color::Cyan)),
        ]),
        Line::from({
            let mut spans = vec![Span::styled("  period   ", label)];
            spans.extend(setup_spans);
            spans
        }),
    ];
    let info_widget = Paragraph::new(info_lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(LUNA_PURPLE))
            .title(Span::styled(
                " luna ",
                Style::default()
                    .fg(LUNA_PURPLE)
                    .add_modifier(Modifier::BOLD),
            )),
    );
    frame.render_widget(info_widget, chunks[0]);

    // ── chat messages ─────────────────────────────────────────────────────────
    let mut lines: Vec<Line> = vec![Line::raw("")];
    for msg in &app.chat {
        lines.extend(msg.to_lines(app.markdown));
    }

    if app.spinning() {
        lines.push(Line::from(Span::styled(
            format!("  {} Luna is thinking…", SPINNER[app.spin_i % SPINNER.len()]),
            Style::default().fg(LUNA_PURPLE),
        )));
    }

    let msg_widget = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(Span::styled(" chat ", Style::default().fg(Color::DarkGray))),
        )
        .wrap(Wrap { trim: false });

    // Wrapped height, so auto-scroll lands on the last line.
    let total = msg_widget.line_count(chunks[1].width.saturating_sub(2)) as u16;
    let view_h = chunks[1].height.saturating_sub(2);
    let max_scroll = total.saturating_sub(view_h);
    if app.scroll == u16::MAX {
        app.scroll = max_scroll;
    }
    app.scroll = app.scroll.min(max_scroll);

    frame.render_widget(msg_widget.scroll((app.scroll, 0)), chunks[1]);

    // ── input box ─────────────────────────────────────────────────────────────
    let busy = app.spinning();
    let border_col = if busy { Color::DarkGray } else { Color::Cyan };

    let before = &app.input[..app.cursor];
    let (cur_ch, after) = match app.input[app.cursor..].chars().next() {
        Some(ch) => {
            let end = app.cursor + ch.len_utf8();
            (ch.to_string(), app.input[end..].to_string())
        }
        None => (" ".to_string(), String::new()),
    };

    let input_line = Line::from(vec![
        Span::styled(before.to_string(), Style::default().fg(Color::White)),
        Span::styled(cur_ch, Style::default().fg(Color::Black).bg(Color::White)),
        Span::styled(after, Style::default().fg(Color::White)),
    ]);

    let title = if busy { " waiting for Luna… " } else { " message " };
    let input_widget = Paragraph::new(input_line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_col))
            .title(Span::styled(title, Style::default().fg(border_col))),
    );

    frame.render_widget(input_widget, chunks[2]);

    // Suggestion popup (only when input starts with '/')
    if !busy && app.setup_form.is_none() && app.input.starts_with('/') {
        let suggestions = slash_suggestions(&app.input);
        if !suggestions.is_empty() {
            let pop_h = suggestions.len() as u16 + 2;
            let pop_w = 60u16.min(area.width);
            let pop_x = chunks[2].x + 1;
            let pop_y = chunks[2].y.saturating_sub(pop_h);
            let pop_rect = Rect::new(pop_x, pop_y, pop_w, pop_h);

            let lines: Vec<Line> = suggestions
                .iter()
                .enumerate()
                .map(|(i, (cmd, desc))| {
                    let selected = app.suggest_idx == Some(i);
                    let (style, desc_style) = if selected {
                        let s = Style::default().fg(Color::Black).bg(Color::Cyan);
                        (s, s)
                    } else {
                        (
                            Style::default().fg(Color::White),
                            Style::default().fg(Color::DarkGray),
                        )
                    };
                    Line::from(vec![
                        Span::styled(format!(" {:<8}", cmd), style),
                        Span::styled(format!(" {}", desc), desc_style),
                    ])
                })
                .collect();

            let popup = Paragraph::new(lines).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan))
                    .title(Span::styled(" commands ", Style::default().fg(Color::Cyan))),
            );

            frame.render_widget(Clear, pop_rect);
            frame.render_widget(popup, pop_rect);
        }
    }

    if let Some(ref form) = app.setup_form {
        render_setup_form(form, area, frame);
    }

    if let Some(ref alert) = app.alert {
        render_alert(alert, area, frame);
    }
}

fn render_setup_form(state: &SetupFormState, area: Rect, frame: &mut Frame) {
    let pop_rect = centered(area, 60, 11);

    let field = |name: &'static str, text: &str, placeholder: &'static str, focused: bool| {
        let label_style = if focused {
            Style::default()
                .fg(LUNA_PURPLE)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let mut spans = vec![Span::styled(format!("  {name:<20}"), label_style)];
        if text.is_empty() && !focused {
            spans.push(Span::styled(placeholder, Style::default().fg(Color::DarkGray)));
        } else {
            spans.push(Span::styled(text.to_string(), Style::default().fg(Color::White)));
        }
        if focused {
            spans.push(Span::styled(" ", Style::default().bg(Color::White)));
        }
        Line::from(spans)
    };

    let lines = vec![
        Line::raw(""),
        Line::from(Span::styled(
            "  Tell Luna about your cycle so answers fit where you are.",
            Style::default().fg(Color::White),
        )),
        Line::raw(""),
        field(
            "last period start",
            &state.form.last_period_date,
            "YYYY-MM-DD",
            state.focus == SetupField::LastPeriodDate,
        ),
        field(
            "cycle length (days)",
            &state.form.cycle_length,
            "28",
            state.focus == SetupField::CycleLength,
        ),
        Line::raw(""),
        Line::from(Span::styled(
            "  tab switch field   enter save   esc close",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let popup = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(LUNA_PURPLE))
            .title(Span::styled(
                " cycle setup ",
                Style::default()
                    .fg(LUNA_PURPLE)
                    .add_modifier(Modifier::BOLD),
            )),
    );

    frame.render_widget(Clear, pop_rect);
    frame.render_widget(popup, pop_rect);
}

fn render_alert(message: &str, area: Rect, frame: &mut Frame) {
    let pop_w = (area.width * 3 / 4).clamp(40, 64);
    let body = Paragraph::new(vec![
        Line::raw(""),
        Line::from(Span::styled(
            message.to_string(),
            Style::default().fg(Color::White),
        )),
        Line::raw(""),
        Line::from(Span::styled(
            "enter / esc to dismiss",
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(Span::styled(
                " ⚠ ",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )),
    );
    let pop_h = (body.line_count(pop_w.saturating_sub(2)) as u16 + 2).max(6);
    let pop_rect = centered(area, pop_w, pop_h);

    frame.render_widget(Clear, pop_rect);
    frame.render_widget(body, pop_rect);
}

pub(super) async fn show_splash(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    key_rx: &mut mpsc::Receiver<Event>,
    model: &str,
) -> Result<()> {
    let subtitle = format!("menstrual health companion  |  {model}");
    loop {
        terminal.draw(|f| {
            let logo_w = LOGO[0].chars().count() as u16;
            let box_h = LOGO.len() as u16 + 6; // logo + subtitle + hint + padding
            let rect = centered(f.area(), logo_w.max(subtitle.len() as u16) + 4, box_h);

            let mut lines: Vec<Line> = LOGO
                .iter()
                .map(|row| {
                    Line::from(Span::styled(
                        *row,
                        Style::default()
                            .fg(LUNA_PURPLE)
                            .add_modifier(Modifier::BOLD),
                    ))
                })
                .collect();
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                subtitle.as_str(),
                Style::default().fg(Color::White),
            )));
            lines.push(Line::from(Span::styled(
                "press any key to start",
                Style::default().fg(Color::DarkGray),
            )));

            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(LUNA_PURPLE))
                .title(Span::styled(
                    " luna ",
                    Style::default()
                        .fg(LUNA_PURPLE)
                        .add_modifier(Modifier::BOLD),
                ));

            let para = Paragraph::new(lines)
                .block(block)
                .alignment(Alignment::Center);

            f.render_widget(para, rect);
        })?;

        if let Ok(Event::Key(k)) = key_rx.try_recv() {
            if k.kind == KeyEventKind::Press {
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use luna_core::ChatSession;
    use ratatui::backend::TestBackend;

    fn screen(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        let info = InfoBar {
            model: "test-model".into(),
            service: "http://127.0.0.1:5000".into(),
        };
        terminal.draw(|f| render(app, &info, f)).unwrap();
        let buf = terminal.backend().buffer().clone();
        buf.content.iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn spinner_shows_only_while_sending() {
        let mut app = App::new(ChatSession::new(None), false);
        assert!(!screen(&mut app).contains("Luna is thinking"));

        app.begin_turn("hi").unwrap();
        assert!(screen(&mut app).contains("Luna is thinking"));

        app.cancel_turn();
        assert!(!screen(&mut app).contains("Luna is thinking"));
    }

    #[test]
    fn setup_form_and_alert_are_drawn() {
        let mut app = App::new(ChatSession::new(None), false);
        app.open_setup_form();
        let s = screen(&mut app);
        assert!(s.contains("cycle setup"));
        assert!(s.contains("not set"));

        app.alert = Some("Please enter the date".into());
        assert!(screen(&mut app).contains("Please enter the date"));
    }
}
