//! Decides between cached and fresh data and assembles snapshots.

use chrono::Duration;

use crate::api::QuestionSource;
use crate::cache::{ CacheStore, KeyValueStore };
use crate::error::FetchError;
use crate::models::{ placeholder_items, Avatar, ItemsResult, Snapshot, TagSet, Timeline };

/// Delay between a successful timeline and the next one.
pub const REFRESH_INTERVAL_MINUTES: i64 = 5;

/// Where a snapshot is going to be shown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Context {
    /// Previews are drawn from cache only and never touch the network.
    pub is_preview: bool,
}

pub struct Orchestrator<F, S> {
    source: F,
    cache: CacheStore<S>,
}

impl<F: QuestionSource, S: KeyValueStore> Orchestrator<F, S> {
    pub fn new(source: F, store: S) -> Self {
        Self { source, cache: CacheStore::new(store) }
    }

    #[cfg(test)]
    pub fn source(&self) -> &F {
        &self.source
    }

    pub fn placeholder(&self) -> Snapshot {
        Snapshot::new(Some(placeholder_items()), None)
    }

    /// Snapshot from the cache, falling back to the placeholder when the cache
    /// is empty or was fetched for different tags.
    pub fn snapshot(&self, tags: &TagSet, context: Context) -> Snapshot {
        let cached = match self.cache.load() {
            Some(items) if !items.is_empty() && items.matches(tags) => items,
            _ => {
                tracing::debug!(tags = %tags.label(), "no usable cache entry, using placeholder");
                return self.placeholder();
            }
        };

        if context.is_preview {
            return Snapshot::new(Some(cached), None);
        }

        let avatar = self.load_avatar(&cached);
        Snapshot::new(Some(cached), avatar)
    }

    /// Fetches fresh data, ignoring the cache. On failure nothing is emitted
    /// and the caller keeps whatever timeline it already has.
    pub fn timeline(&self, tags: &TagSet) -> Result<Timeline, FetchError> {
        let items = self.source.fetch_items(tags).inspect_err(|err| {
            tracing::warn!(
                error = %err,
                kind = ?err.kind(),
                tags = %tags.label(),
                "featured question fetch failed"
            );
        })?;
        self.cache.save(&items);

        tracing::info!(
            tags = %tags.label(),
            found = !items.is_empty(),
            question_id = ?items.first_item().and_then(|item| item.question_id),
            "featured question refreshed"
        );

        let avatar = self.load_avatar(&items);
        let entry = Snapshot::new(Some(items), avatar);
        let refresh_after = entry.date + Duration::minutes(REFRESH_INTERVAL_MINUTES);

        Ok(Timeline { entries: vec![entry], refresh_after })
    }

    /// Owner avatar of the first item, if it has one and it can be fetched.
    fn load_avatar(&self, items: &ItemsResult) -> Option<Avatar> {
        let url = items.avatar_url()?;
        match self.source.fetch_image(url) {
            Ok(avatar) => Some(avatar),
            Err(err) => {
                tracing::warn!(error = %err, url, "avatar fetch failed, using default icon");
                None
            }
        }
    }
}
