use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

const HEADING: Style = Style::new().fg(Color::Yellow).add_modifier(Modifier::BOLD);
const CODE_INLINE: Style = Style::new().fg(Color::Cyan).bg(Color::Rgb(48, 48, 48));
const CODE_BLOCK: Style = Style::new().fg(Color::Gray);
const CODE_BAR: Style = Style::new().fg(Color::DarkGray);
const LIST_MARKER: Style = Style::new().fg(Color::Cyan);
const BODY: Style = Style::new().fg(Color::White);

/// Markdown to styled terminal lines. Every line starts with `indent`.
pub(super) fn markdown_lines(text: &str, indent: &str) -> Vec<Line<'static>> {
    let mut w = LineWriter::new(indent);
    for event in Parser::new(text) {
        w.event(event);
    }
    w.finish()
}

fn is_blank(line: &Line<'_>) -> bool {
    line.spans.iter().all(|s| s.content.is_empty())
}

struct LineWriter {
    indent: String,
    lines: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
    styles: Vec<Style>,
    /// `Some(n)` for an ordered list at item `n`, `None` for bullets.
    lists: Vec<Option<u64>>,
    in_code_block: bool,
}

impl LineWriter {
    fn new(indent: &str) -> Self {
        Self {
            indent: indent.to_string(),
            lines: Vec::new(),
            spans: Vec::new(),
            styles: vec![BODY],
            lists: Vec::new(),
            in_code_block: false,
        }
    }

    fn style(&self) -> Style {
        self.styles.last().copied().unwrap_or(BODY)
    }

    fn push_style(&mut self, patch: Style) {
        let next = self.style().patch(patch);
        self.styles.push(next);
    }

    fn pop_style(&mut self) {
        if self.styles.len() > 1 {
            self.styles.pop();
        }
    }

    fn flush(&mut self) {
        if self.spans.is_empty() {
            return;
        }
        let mut spans = vec![Span::raw(self.indent.clone())];
        spans.append(&mut self.spans);
        self.lines.push(Line::from(spans));
    }

    fn blank(&mut self) {
        if self.lines.last().is_some_and(is_blank) {
            return;
        }
        self.lines.push(Line::default());
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(Tag::Heading { .. }) => {
                self.flush();
                self.push_style(HEADING);
            }
            Event::End(TagEnd::Heading(_)) => {
                self.pop_style();
                self.flush();
                self.blank();
            }
            Event::End(TagEnd::Paragraph) => {
                self.flush();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            Event::Start(Tag::Strong) => self.push_style(Style::new().add_modifier(Modifier::BOLD)),
            Event::Start(Tag::Emphasis) => {
                self.push_style(Style::new().add_modifier(Modifier::ITALIC))
            }
            Event::End(TagEnd::Strong) | Event::End(TagEnd::Emphasis) => self.pop_style(),
            Event::Start(Tag::List(start)) => {
                self.flush();
                self.lists.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                self.flush();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            Event::Start(Tag::Item) => {
                self.flush();
                let depth = self.lists.len().saturating_sub(1);
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let m = format!("{n}. ");
                        *n += 1;
                        m
                    }
                    _ => "• ".to_string(),
                };
                self.spans.push(Span::raw("  ".repeat(depth)));
                self.spans.push(Span::styled(marker, LIST_MARKER));
            }
            Event::End(TagEnd::Item) => self.flush(),
            Event::Start(Tag::CodeBlock(kind)) => {
                self.flush();
                self.in_code_block = true;
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.is_empty() {
                        self.spans.push(Span::styled(format!("╭ {lang}"), CODE_BAR));
                        self.flush();
                    }
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                self.in_code_block = false;
                self.blank();
            }
            Event::Text(t) if self.in_code_block => {
                for l in t.lines() {
                    self.spans.push(Span::styled("│ ", CODE_BAR));
                    self.spans.push(Span::styled(l.to_string(), CODE_BLOCK));
                    self.flush();
                }
            }
            Event::Text(t) => {
                let style = self.style();
                self.spans.push(Span::styled(t.into_string(), style));
            }
            Event::Code(t) => self.spans.push(Span::styled(t.into_string(), CODE_INLINE)),
            Event::SoftBreak => {
                let style = self.style();
                self.spans.push(Span::styled(" ", style));
            }
            Event::HardBreak => self.flush(),
            Event::Rule => {
                self.flush();
                self.spans.push(Span::styled("─".repeat(24), CODE_BAR));
                self.flush();
                self.blank();
            }
            // Raw HTML is shown as typed.
            Event::Html(t) => {
                let style = self.style();
                for l in t.lines() {
                    self.spans.push(Span::styled(l.to_string(), style));
                    self.flush();
                }
            }
            Event::End(TagEnd::HtmlBlock) => self.blank(),
            Event::InlineHtml(t) => {
                let style = self.style();
                self.spans.push(Span::styled(t.into_string(), style));
            }
            _ => {}
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush();
        while self.lines.last().is_some_and(is_blank) {
            self.lines.pop();
        }
        self.lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(lines: &[Line<'_>]) -> Vec<String> {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn heading_and_bold() {
        let lines = markdown_lines("# Rest\n\nTake it **easy** today.", "  ");
        assert_eq!(plain(&lines), vec!["  Rest", "", "  Take it easy today."]);

        let heading = &lines[0].spans[1];
        assert!(heading.style.add_modifier.contains(Modifier::BOLD));
        let easy = lines[2].spans.iter().find(|s| s.content == "easy").unwrap();
        assert!(easy.style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn bullet_and_numbered_lists() {
        let bullets = markdown_lines("- warmth\n- rest", "");
        assert_eq!(plain(&bullets), vec!["• warmth", "• rest"]);

        let numbered = markdown_lines("1. water\n2. sleep", "");
        assert_eq!(plain(&numbered), vec!["1. water", "2. sleep"]);
    }

    #[test]
    fn nested_items_are_indented() {
        let lines = markdown_lines("- food\n  - iron\n- sleep", "");
        assert_eq!(plain(&lines), vec!["• food", "  • iron", "• sleep"]);
    }

    #[test]
    fn code_block_lines_get_a_bar() {
        let lines = markdown_lines("```\nday = 5\nphase = 1\n```", "  ");
        assert_eq!(plain(&lines), vec!["  │ day = 5", "  │ phase = 1"]);
    }

    #[test]
    fn inline_code_is_styled() {
        let lines = markdown_lines("run `/setup` again", "");
        let code = lines[0].spans.iter().find(|s| s.content == "/setup").unwrap();
        assert_eq!(code.style, CODE_INLINE);
    }

    #[test]
    fn html_is_kept_as_text() {
        let inline = markdown_lines("feel <b>better</b> soon", "");
        assert_eq!(plain(&inline), vec!["feel <b>better</b> soon"]);

        let block = markdown_lines("<div>note</div>\n\nafter", "");
        assert_eq!(plain(&block), vec!["<div>note</div>", "", "after"]);
    }

    #[test]
    fn soft_breaks_join_paragraph_lines() {
        let lines = markdown_lines("hello\nworld", "");
        assert_eq!(plain(&lines), vec!["hello world"]);
    }
}
