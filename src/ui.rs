use crate::{
    api::QuestionSource,
    app::App,
    cache::KeyValueStore,
    pipeline::Orchestrator,
    render::{ gradient_at, render, truncate_line, wrap_title, AvatarView, Card, RenderModel, AVATAR_PIXELS },
    utils::{ time_until, timestamp_to_elapsed },
};
use chrono::{ DateTime, Utc };
use tui::{
    backend::Backend,
    buffer::Buffer,
    Terminal,
    Frame,
    widgets::{ Paragraph, Widget, Wrap },
    layout::{ Alignment, Layout, Constraint, Direction, Margin, Rect },
    text::{ Span, Spans, Text },
    style::{ Style, Color, Modifier },
};
use std::sync::{ mpsc, Arc };
use std::time::{ Duration, Instant };

/// Roughly the proportions of a medium home-screen widget.
const WIDGET_WIDTH: u16 = 64;
const WIDGET_HEIGHT: u16 = 12;

pub fn run_app<B: Backend, F, S>(
    terminal: &mut Terminal<B>,
    mut app: App,
    orchestrator: Arc<Orchestrator<F, S>>,
    tick_rate: Duration
) -> std::io::Result<()>
where
    F: QuestionSource + 'static,
    S: KeyValueStore + 'static,
{
    let (tx, rx) = mpsc::channel();
    let mut last_tick = Instant::now();
    loop {
        if app.refresh_due(Utc::now()) {
            app.start_refresh(&orchestrator, &tx);
        }
        while let Ok(update) = rx.try_recv() {
            app.on_update(update, Utc::now());
        }

        terminal.draw(|f| draw_ui(f, &app))?;

        let timeout = tick_rate.checked_sub(last_tick.elapsed()).unwrap_or_default();
        if crossterm::event::poll(timeout)? {
            if let crossterm::event::Event::Key(key) = crossterm::event::read()? {
                use crossterm::event::KeyCode::*;
                match key.code {
                    Char('q') | Esc => {
                        return Ok(());
                    }
                    Char('r') => app.on_refresh_requested(Utc::now()),
                    _ => {}
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }
    }
}

pub fn draw_ui<B: Backend>(f: &mut Frame<B>, app: &App) {
    let full_area = f.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(full_area);

    let area = centered(chunks[0], WIDGET_WIDTH, WIDGET_HEIGHT);
    f.render_widget(GradientBackground, area);

    let inner = area.inner(&Margin { vertical: 1, horizontal: 2 });
    match render(&app.snapshot) {
        RenderModel::Card(card) => draw_card(f, inner, &card),
        RenderModel::Message(message) => {
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Percentage(40), Constraint::Min(0)])
                .split(inner);
            let paragraph = Paragraph::new(Span::styled(message, Style::default().fg(Color::Black)))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true });
            f.render_widget(paragraph, rows[1]);
        }
    }

    f.render_widget(
        Paragraph::new(Span::styled(status_line(app), Style::default().fg(Color::DarkGray)))
            .alignment(Alignment::Center),
        chunks[1]
    );
}

fn draw_card<B: Backend>(f: &mut Frame<B>, area: Rect, card: &Card) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    let header = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(AVATAR_PIXELS as u16 + 1), Constraint::Min(0)])
        .split(rows[0]);

    f.render_widget(AvatarWidget(&card.avatar), header[0]);

    let text_width = header[1].width as usize;
    let mut header_lines = vec![
        Spans::from(Span::styled(
            truncate_line(&card.name, text_width),
            Style::default().fg(Color::Black).add_modifier(Modifier::BOLD)
        ))
    ];
    let details = bounty_details(card, Utc::now());
    if !details.is_empty() {
        header_lines.push(Spans::from(Span::styled(
            truncate_line(&details.join(" · "), text_width),
            Style::default().fg(Color::Black)
        )));
    }
    f.render_widget(Paragraph::new(Text::from(header_lines)), header[1]);

    let title: Vec<Spans> = wrap_title(&card.title, rows[1].width as usize)
        .into_iter()
        .map(|line| Spans::from(Span::styled(line, Style::default().fg(Color::Black).add_modifier(Modifier::BOLD))))
        .collect();
    f.render_widget(Paragraph::new(Text::from(title)), rows[1]);

    let mut chips = Vec::new();
    for tag in &card.tags {
        chips.push(Span::styled(format!(" {tag} "), Style::default().fg(Color::White).bg(Color::Black)));
        chips.push(Span::raw(" "));
    }
    f.render_widget(Paragraph::new(Spans::from(chips)), rows[2]);

    if let Some(link) = &card.link {
        f.render_widget(
            Paragraph::new(Span::styled(
                truncate_line(link, rows[4].width as usize),
                Style::default().fg(Color::Black).add_modifier(Modifier::UNDERLINED)
            )),
            rows[4]
        );
    }
}

/// Bounty amount, time left on the bounty and question score, whichever are known.
fn bounty_details(card: &Card, now: DateTime<Utc>) -> Vec<String> {
    let mut details = Vec::new();
    if let Some(amount) = card.bounty_amount {
        details.push(format!("+{amount} bounty"));
    }
    if let Some(closes_at) = card.closes_at {
        details.push(match time_until(closes_at, now) {
            Some(left) => format!("closes {left}"),
            None => "closed".to_string(),
        });
    }
    if let Some(score) = card.score {
        details.push(format!("score {score}"));
    }
    details
}

fn status_line(app: &App) -> String {
    let now = Utc::now();
    let mut parts = Vec::new();

    match app.last_refresh {
        Some(at) => parts.push(format!("updated {}", timestamp_to_elapsed(at, now))),
        None if app.in_flight => parts.push("loading…".to_string()),
        None => {}
    }
    if app.last_error.is_some() {
        parts.push("stale".to_string());
    }
    if !app.in_flight {
        if let Some(next) = time_until(app.next_refresh, now) {
            parts.push(format!("next refresh {next}"));
        }
    }
    parts.push("r refresh · q quit".to_string());
    parts.join(" · ")
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// Fixed decorative background behind every card and message.
struct GradientBackground;

impl Widget for GradientBackground {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let span = area.width.saturating_sub(1).max(1) as f32;
        for x in area.left()..area.right() {
            let (r, g, b) = gradient_at((x - area.left()) as f32 / span);
            for y in area.top()..area.bottom() {
                buf.get_mut(x, y).set_symbol(" ").set_bg(Color::Rgb(r, g, b));
            }
        }
    }
}

/// Avatar drawn with half blocks: each cell shows two stacked pixels.
struct AvatarWidget<'a>(&'a AvatarView);

impl Widget for AvatarWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let size = AVATAR_PIXELS as u16;
        match self.0 {
            AvatarView::Pixels(pixels) if pixels.len() >= (size * size) as usize => {
                for row in 0..(size / 2).min(area.height) {
                    for col in 0..size.min(area.width) {
                        let top = pixels[(row * 2 * size + col) as usize];
                        let bottom = pixels[((row * 2 + 1) * size + col) as usize];
                        buf.get_mut(area.x + col, area.y + row)
                            .set_symbol("▀")
                            .set_fg(Color::Rgb(top[0], top[1], top[2]))
                            .set_bg(Color::Rgb(bottom[0], bottom[1], bottom[2]));
                    }
                }
            }
            // Short pixel grids fall back to the icon.
            _ => {
                if area.width > 0 && area.height > 0 {
                    buf.set_string(area.x, area.y, "◉", Style::default().fg(Color::Black));
                }
            }
        }
    }
}

/// Text rendition of a render model, used by `--once`.
pub fn render_plain(model: &RenderModel, width: usize) -> String {
    match model {
        RenderModel::Message(message) => message.clone(),
        RenderModel::Card(card) => {
            let mut lines = Vec::new();
            let details = bounty_details(card, Utc::now());
            if details.is_empty() {
                lines.push(truncate_line(&card.name, width));
            } else {
                lines.push(truncate_line(&format!("{}  {}", card.name, details.join(" · ")), width));
            }
            lines.extend(wrap_title(&card.title, width));
            if !card.tags.is_empty() {
                lines.push(card.tags.iter().map(|tag| format!("[{tag}]")).collect::<Vec<_>>().join(" "));
            }
            if let Some(link) = &card.link {
                lines.push(link.clone());
            }
            lines.join("\n")
        }
    }
}
