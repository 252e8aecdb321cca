//! Snapshot → render model. Pure: no network, no storage, no terminal.

use chrono::{ DateTime, TimeZone, Utc };
use image::imageops::FilterType;

use crate::models::{ Avatar, Snapshot };

/// Title is clamped to this many lines.
pub const TITLE_MAX_LINES: usize = 3;

/// Avatars are downsampled to an `AVATAR_PIXELS`×`AVATAR_PIXELS` grid.
pub const AVATAR_PIXELS: u32 = 4;

/// Decorative background colour stops, left to right.
pub const GRADIENT: [(u8, u8, u8); 6] = [
    (255, 59, 48), // red
    (255, 149, 0), // orange
    (255, 204, 0), // yellow
    (255, 149, 0),
    (175, 82, 222), // purple
    (255, 45, 85), // pink
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AvatarView {
    DefaultIcon,
    /// Row-major RGB grid of `AVATAR_PIXELS` squared entries.
    Pixels(Vec<[u8; 3]>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Card {
    pub avatar: AvatarView,
    pub name: String,
    pub title: String,
    pub tags: Vec<String>,
    pub bounty_amount: Option<u32>,
    pub closes_at: Option<DateTime<Utc>>,
    pub score: Option<i64>,
    pub link: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderModel {
    Card(Card),
    Message(String),
}

pub fn render(snapshot: &Snapshot) -> RenderModel {
    let item = snapshot.first_item();
    let title = item.and_then(|item| item.title.as_deref()).map(decode_entities);
    let name = item
        .and_then(|item| item.owner.as_ref())
        .and_then(|owner| owner.display_name.as_deref())
        .map(decode_entities);

    match (item, title, name) {
        (Some(item), Some(title), Some(name)) if !title.is_empty() && !name.is_empty() =>
            RenderModel::Card(Card {
                avatar: snapshot.avatar.as_ref().map_or(AvatarView::DefaultIcon, avatar_view),
                name,
                title,
                tags: item.tags.clone().unwrap_or_default(),
                bounty_amount: item.bounty_amount,
                closes_at: item.bounty_closes_date.and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
                score: item.score,
                link: item.link.clone(),
            }),
        _ => {
            let label = snapshot.items
                .as_ref()
                .and_then(|items| items.requested_tags.as_ref())
                .map_or_else(|| "no".to_string(), |tags| tags.label());
            RenderModel::Message(format!("Can't find any questions with {label} tags"))
        }
    }
}

fn avatar_view(avatar: &Avatar) -> AvatarView {
    let small = avatar.0.resize_exact(AVATAR_PIXELS, AVATAR_PIXELS, FilterType::Triangle).to_rgb8();
    AvatarView::Pixels(small.pixels().map(|pixel| pixel.0).collect())
}

/// The API HTML-encodes titles and names (`&#39;`, `&amp;`, ...).
fn decode_entities(text: &str) -> String {
    html2text::from_read(text.as_bytes(), 1000).trim().to_string()
}

/// Wraps `title` to `width` columns, keeping at most [`TITLE_MAX_LINES`] lines
/// and marking the cut with an ellipsis.
pub fn wrap_title(title: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let options = textwrap::Options::new(width).wrap_algorithm(textwrap::WrapAlgorithm::FirstFit);
    let mut lines: Vec<String> = textwrap::wrap(title, options).into_iter().map(|l| l.into_owned()).collect();

    if lines.len() > TITLE_MAX_LINES {
        lines.truncate(TITLE_MAX_LINES);
        if let Some(last) = lines.last_mut() {
            *last = truncate_line(&format!("{last}…"), width);
        }
    }
    lines
}

/// Clips `text` to a single line of at most `width` characters.
pub fn truncate_line(text: &str, width: usize) -> String {
    let text = text.lines().next().unwrap_or_default();
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut clipped: String = text.chars().take(width - 1).collect();
    clipped.push('…');
    clipped
}

/// Background colour at horizontal position `t` in `0.0..=1.0`.
pub fn gradient_at(t: f32) -> (u8, u8, u8) {
    let t = t.clamp(0.0, 1.0) * (GRADIENT.len() - 1) as f32;
    let index = (t.floor() as usize).min(GRADIENT.len() - 2);
    let frac = t - index as f32;
    let (a, b) = (GRADIENT[index], GRADIENT[index + 1]);
    let lerp = |x: u8, y: u8| ((x as f32) + ((y as f32) - (x as f32)) * frac).round() as u8;
    (lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
}
