use chrono::{DateTime, Utc};
use image::DynamicImage;

/// Ordered tag filter. An empty set means the query is unfiltered.
#[derive(serde::Deserialize, serde::Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct TagSet(Vec<String>);

impl TagSet {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(tags.into_iter().map(Into::into).collect())
    }

    /// Splits a `;`-separated list, dropping blank entries.
    pub fn parse(raw: &str) -> Self {
        Self::new(raw.split(';').map(str::trim).filter(|tag| !tag.is_empty()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Value of the `tagged` query parameter.
    pub fn tagged_param(&self) -> String {
        self.0.join(";")
    }

    /// Human-readable label used in the "can't find" message.
    pub fn label(&self) -> String {
        if self.0.is_empty() { "no".to_string() } else { self.0.join(" ") }
    }
}

#[derive(serde::Deserialize, serde::Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Owner {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// One featured question. The API may omit any field.
#[derive(serde::Deserialize, serde::Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct QuestionItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Owner>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounty_amount: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounty_closes_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
}

/// Decoded question list together with the tags that produced it.
///
/// `requested_tags` is only stamped after a successful live fetch, so a
/// cached value can be checked against the currently configured tags.
#[derive(serde::Deserialize, serde::Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ItemsResult {
    pub items: Vec<QuestionItem>,
    #[serde(rename = "requestedTags", default, skip_serializing_if = "Option::is_none")]
    pub requested_tags: Option<TagSet>,
}

impl ItemsResult {
    pub fn first_item(&self) -> Option<&QuestionItem> {
        self.items.first()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// True when this result was fetched for exactly `tags`.
    pub fn matches(&self, tags: &TagSet) -> bool {
        self.requested_tags.as_ref() == Some(tags)
    }

    pub fn avatar_url(&self) -> Option<&str> {
        self.first_item()?.owner.as_ref()?.profile_image.as_deref()
    }
}

/// Envelope of `/questions/featured`.
#[derive(serde::Deserialize)]
pub struct QuestionsResponse {
    pub items: Vec<QuestionItem>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub quota_remaining: Option<u32>,
}

/// Owner avatar decoded from the profile image URL.
#[derive(Clone, Debug, PartialEq)]
pub struct Avatar(pub DynamicImage);

/// Immutable render input.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub date: DateTime<Utc>,
    pub items: Option<ItemsResult>,
    pub avatar: Option<Avatar>,
}

impl Snapshot {
    pub fn new(items: Option<ItemsResult>, avatar: Option<Avatar>) -> Self {
        Self { date: Utc::now(), items, avatar }
    }

    pub fn first_item(&self) -> Option<&QuestionItem> {
        self.items.as_ref()?.first_item()
    }
}

/// Snapshots plus the time the host should ask for a new timeline.
#[derive(Clone, Debug)]
pub struct Timeline {
    pub entries: Vec<Snapshot>,
    pub refresh_after: DateTime<Utc>,
}

pub fn placeholder_items() -> ItemsResult {
    ItemsResult {
        items: vec![QuestionItem {
            tags: Some(vec![
                "Hypothetical Personal Situations".to_string(),
                "Personal Question".to_string(),
            ]),
            owner: Some(Owner {
                profile_image: None,
                display_name: Some("Anonymous".to_string()),
            }),
            link: None,
            title: Some(
                "If I ate myself, would I become twice as big or disappear completely?".to_string()
            ),
            ..QuestionItem::default()
        }],
        requested_tags: None,
    }
}
