use crate::styles;
use anyhow::Result;
use prospector_common::BusinessResult;
use prospector_search::SearchState;
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use std::{io::Stdout, rc::Rc};
use textwrap::wrap;

pub const HELP_LINES: &[&str] = &[
    "Enter            search for the text in the box",
    "Tab / Ctrl-L     toggle \"Use my location\"",
    "Up/Down PgUp/Dn  scroll results",
    "/location on|off set the location toggle",
    "/help            show this help",
    "/quit, Ctrl-C    exit",
];

const FEATURES: [(&str, &str); 3] = [
    ("Phone Numbers", "Direct lines pulled from Google Maps listings."),
    ("Physical Address", "Street addresses for every matching business."),
    ("Website & Social", "Links to sites and profiles, with cited sources."),
];

pub struct ViewSnap {
    pub input: String,
    pub input_cursor: usize,
    pub use_location: bool,
    pub state: SearchState,
    pub scroll: usize,
    pub spinner: &'static str,
    pub show_help: bool,
    pub notice: Option<String>,
}

pub fn draw(term: &mut Terminal<CrosstermBackend<Stdout>>, snap: &ViewSnap) -> Result<()> {
    term.draw(|frame| render(frame, snap))?;
    Ok(())
}

/// Header, hero, form, body, footer.
fn screen_layout(area: Rect) -> Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(2),
            Constraint::Length(5),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(area)
}

/// Inner width and height of the results panel on a screen of `area`.
fn results_viewport(area: Rect) -> (usize, usize) {
    let body = screen_layout(area)[3];
    (
        body.width.saturating_sub(2) as usize,
        body.height.saturating_sub(2) as usize,
    )
}

/// Largest useful scroll offset for `result` on a screen of `area`.
pub fn max_scroll(result: &BusinessResult, area: Rect) -> usize {
    let (width, height) = results_viewport(area);
    results_lines(result, width).len().saturating_sub(height)
}

fn render(frame: &mut Frame<'_>, snap: &ViewSnap) {
    let layout = screen_layout(frame.area());

    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ◆ Prospector ", styles::brand()),
        Span::styled("lead finder", styles::dim()),
    ]));
    frame.render_widget(header, layout[0]);

    let hero = Paragraph::new(Line::from(vec![
        Span::styled(" Find leads with ", styles::hero()),
        Span::styled("Precision.", styles::accent()),
    ]));
    frame.render_widget(hero, layout[1]);

    render_form(frame, layout[2], snap);

    let body = layout[3];
    if snap.show_help {
        let lines: Vec<Line> = HELP_LINES
            .iter()
            .map(|l| Line::styled(format!(" {l}"), styles::value()))
            .collect();
        let help = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Help "));
        frame.render_widget(help, body);
    } else {
        match &snap.state {
            SearchState::Idle => render_features(frame, body),
            SearchState::Loading => {
                let waiting = Paragraph::new(Line::from(vec![
                    Span::styled(format!(" {} ", snap.spinner), styles::busy()),
                    Span::styled("Searching Google Maps…", styles::busy()),
                ]))
                .block(Block::default().borders(Borders::ALL));
                frame.render_widget(waiting, body);
            }
            SearchState::Error(message) => {
                let panel = Paragraph::new(error_lines(message))
                    .wrap(Wrap { trim: false })
                    .block(
                        Block::default()
                            .borders(Borders::ALL)
                            .border_style(styles::error()),
                    );
                frame.render_widget(panel, body);
            }
            SearchState::Success(result) => {
                render_results(frame, body, result, snap.scroll, frame.area())
            }
        }
    }

    let footer = Paragraph::new(Line::from(vec![
        Span::styled(format!(" {} ", snap.spinner), styles::busy()),
        Span::styled(status_label(&snap.state), status_style(&snap.state)),
        Span::styled("  •  Powered by Gemini 2.5", styles::dim()),
        Span::styled("  •  /help", styles::dim()),
    ]));
    frame.render_widget(footer, layout[4]);
}

fn render_form(frame: &mut Frame<'_>, area: Rect, snap: &ViewSnap) {
    let checkbox = if snap.use_location { "[x]" } else { "[ ]" };
    let mut lines = vec![
        Line::styled(snap.input.clone(), styles::value()),
        Line::from(vec![
            Span::styled(format!("{checkbox} Use my location"), styles::label()),
            Span::styled("  (Tab)", styles::dim()),
        ]),
    ];
    if let Some(notice) = &snap.notice {
        lines.push(Line::styled(notice.clone(), styles::dim()));
    }

    let form = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" What kind of business are you looking for? "),
    );
    frame.render_widget(Clear, area);
    frame.render_widget(form, area);

    let caret_x = area.x + 1 + visual_caret_col(&snap.input, snap.input_cursor);
    frame.set_cursor_position(Position {
        x: caret_x.min(area.right().saturating_sub(2)),
        y: area.y + 1,
    });
}

fn render_features(frame: &mut Frame<'_>, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 3); 3])
        .split(area);
    for (slot, (title, blurb)) in columns.iter().zip(FEATURES) {
        let card = Paragraph::new(Line::styled(blurb, styles::value()))
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(Span::styled(format!(" {title} "), styles::label())),
            );
        frame.render_widget(card, *slot);
    }
}

fn render_results(
    frame: &mut Frame<'_>,
    area: Rect,
    result: &BusinessResult,
    scroll: usize,
    screen: Rect,
) {
    let (content_width, visible_h) = results_viewport(screen);
    let lines = results_lines(result, content_width);
    let start = scroll.min(lines.len().saturating_sub(visible_h));

    let shown: Vec<Line> = lines
        .into_iter()
        .skip(start)
        .take(visible_h)
        .map(|(text, style)| Line::styled(text, style))
        .collect();
    let panel =
        Paragraph::new(shown).block(Block::default().borders(Borders::ALL).title(" Results "));
    frame.render_widget(panel, area);
}

fn error_lines(message: &str) -> Vec<Line<'static>> {
    vec![
        Line::styled(" Something went wrong", styles::error()),
        Line::styled(format!(" {message}"), styles::error_text()),
    ]
}

fn status_label(state: &SearchState) -> String {
    match state {
        SearchState::Idle => "Ready".to_string(),
        SearchState::Loading => "Searching…".to_string(),
        SearchState::Success(result) => match result.links.len() {
            1 => "Done • 1 source".to_string(),
            n => format!("Done • {n} sources"),
        },
        SearchState::Error(_) => "Error".to_string(),
    }
}

fn status_style(state: &SearchState) -> Style {
    match state {
        SearchState::Loading => styles::busy(),
        SearchState::Error(_) => styles::error(),
        _ => styles::accent(),
    }
}

/// Narrative text wrapped to `width`, then a numbered "Sources" list.
pub fn results_lines(result: &BusinessResult, width: usize) -> Vec<(String, Style)> {
    let width = width.max(1);
    let mut out = Vec::new();

    for raw_line in result.text.lines() {
        if raw_line.trim().is_empty() {
            out.push((String::new(), styles::value()));
            continue;
        }
        out.extend(
            wrap(raw_line, width)
                .into_iter()
                .map(|seg| (seg.into_owned(), styles::value())),
        );
    }

    if !result.links.is_empty() {
        out.push((String::new(), styles::value()));
        out.push(("Sources".to_string(), styles::label()));
        for (idx, link) in result.links.iter().enumerate() {
            let prefix = format!("{}. ", idx + 1);
            let indent = " ".repeat(prefix.len());
            let title_opts = textwrap::Options::new(width)
                .initial_indent(&prefix)
                .subsequent_indent(&indent);
            out.extend(
                wrap(&link.title, title_opts)
                    .into_iter()
                    .map(|seg| (seg.into_owned(), styles::value())),
            );
            let uri_opts = textwrap::Options::new(width)
                .initial_indent(&indent)
                .subsequent_indent(&indent)
                .break_words(true);
            out.extend(
                wrap(&link.uri, uri_opts)
                    .into_iter()
                    .map(|seg| (seg.into_owned(), styles::link())),
            );
        }
    }

    out
}

fn visual_caret_col(input: &str, cursor: usize) -> u16 {
    use unicode_width::UnicodeWidthStr;
    UnicodeWidthStr::width(&input[..cursor.min(input.len())]) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use prospector_common::GroundingLink;

    fn texts(lines: &[(String, Style)]) -> Vec<&str> {
        lines.iter().map(|(t, _)| t.as_str()).collect()
    }

    #[test]
    fn results_list_numbered_sources_after_text() {
        let result = BusinessResult {
            text: "Acme Corp, 555-1234".into(),
            links: vec![
                GroundingLink::new("Acme", "http://acme.example"),
                GroundingLink::new("Bolt", "http://bolt.example"),
            ],
        };
        let lines = results_lines(&result, 80);
        assert_eq!(
            texts(&lines),
            vec![
                "Acme Corp, 555-1234",
                "",
                "Sources",
                "1. Acme",
                "   http://acme.example",
                "2. Bolt",
                "   http://bolt.example",
            ]
        );
        assert_eq!(lines[4].1, styles::link());
    }

    #[test]
    fn narrow_width_wraps_text_and_omits_empty_sources() {
        let result = BusinessResult {
            text: "one two three four".into(),
            links: vec![],
        };
        let lines = results_lines(&result, 9);
        assert_eq!(texts(&lines), vec!["one two", "three", "four"]);
    }

    #[test]
    fn status_label_counts_sources() {
        let one = SearchState::Success(BusinessResult {
            text: "x".into(),
            links: vec![GroundingLink::new("a", "b")],
        });
        assert_eq!(status_label(&one), "Done • 1 source");
        assert_eq!(status_label(&SearchState::Idle), "Ready");
        assert_eq!(status_label(&SearchState::Error("e".into())), "Error");
    }

    #[test]
    fn error_panel_leads_with_headline() {
        let lines = error_lines("rate limited");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].to_string(), " rate limited");
    }

    #[test]
    fn max_scroll_stops_at_last_screenful() {
        let result = BusinessResult {
            text: (1..=30).map(|n| format!("line {n}")).collect::<Vec<_>>().join("\n"),
            links: vec![],
        };
        // 24 rows: 9 for chrome, 2 for the panel border, 13 visible.
        let screen = Rect::new(0, 0, 80, 24);
        assert_eq!(max_scroll(&result, screen), 30 - 13);

        let short = BusinessResult {
            text: "one".into(),
            links: vec![],
        };
        assert_eq!(max_scroll(&short, screen), 0);
    }

    #[test]
    fn caret_counts_display_columns() {
        assert_eq!(visual_caret_col("日本", "日本".len()), 4);
        assert_eq!(visual_caret_col("abc", 99), 3);
    }
}
