use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread;

use anyhow::Context as _;
use chrono::{ DateTime, Duration, Utc };

use crate::api::QuestionSource;
use crate::cache::KeyValueStore;
use crate::models::{ Snapshot, TagSet, Timeline };
use crate::pipeline::{ Context, Orchestrator, REFRESH_INTERVAL_MINUTES };

/// Completion messages sent back from the refresh worker.
pub enum Update {
    Snapshot(Snapshot),
    Timeline(Result<Timeline, String>),
}

pub struct App {
    pub tags: TagSet,
    pub snapshot: Snapshot,
    pub last_refresh: Option<DateTime<Utc>>,
    pub next_refresh: DateTime<Utc>,
    pub last_error: Option<String>,
    pub in_flight: bool,
}

impl App {
    pub fn new(tags: TagSet, placeholder: Snapshot) -> Self {
        Self {
            tags,
            snapshot: placeholder,
            last_refresh: None,
            next_refresh: Utc::now(),
            last_error: None,
            in_flight: false,
        }
    }

    /// One request at a time; the next one waits for the timeline's refresh date.
    pub fn refresh_due(&self, now: DateTime<Utc>) -> bool {
        !self.in_flight && now >= self.next_refresh
    }

    pub fn on_refresh_requested(&mut self, now: DateTime<Utc>) {
        if !self.in_flight {
            self.next_refresh = now;
        }
    }

    pub fn on_update(&mut self, update: Update, now: DateTime<Utc>) {
        match update {
            Update::Snapshot(snapshot) => {
                // Never let a cached snapshot replace a fresher timeline entry.
                if self.last_refresh.is_none() {
                    self.snapshot = snapshot;
                }
            }
            Update::Timeline(Ok(timeline)) => {
                self.in_flight = false;
                self.last_error = None;
                self.last_refresh = Some(now);
                self.next_refresh = timeline.refresh_after;
                if let Some(entry) = timeline.entries.into_iter().last() {
                    self.snapshot = entry;
                }
            }
            Update::Timeline(Err(err)) => {
                // Keep showing the previous entry; try again next cycle.
                self.in_flight = false;
                self.last_error = Some(err);
                self.next_refresh = now + Duration::minutes(REFRESH_INTERVAL_MINUTES);
            }
        }
    }

    /// Runs one refresh cycle on a worker thread. The first cycle also sends a
    /// cache-only preview so something real shows up before the network does;
    /// the avatar arrives with the timeline.
    pub fn start_refresh<F, S>(&mut self, orchestrator: &Arc<Orchestrator<F, S>>, tx: &Sender<Update>)
    where
        F: QuestionSource + 'static,
        S: KeyValueStore + 'static,
    {
        self.in_flight = true;
        let first_cycle = self.last_refresh.is_none() && self.last_error.is_none();
        let orchestrator = Arc::clone(orchestrator);
        let tags = self.tags.clone();
        let tx = tx.clone();

        thread::spawn(move || {
            if first_cycle {
                let snapshot = orchestrator.snapshot(&tags, Context { is_preview: true });
                if tx.send(Update::Snapshot(snapshot)).is_err() {
                    return;
                }
            }
            let timeline = orchestrator.timeline(&tags).map_err(|err| err.to_string());
            let _ = tx.send(Update::Timeline(timeline));
        });
    }
}

/// Snapshot printed by `--once`. With `cached` set it comes from the cache in
/// that context; otherwise one fresh timeline is fetched and a failure is
/// returned to the caller.
pub fn once_snapshot<F, S>(
    orchestrator: &Orchestrator<F, S>,
    tags: &TagSet,
    cached: Option<Context>
) -> anyhow::Result<Snapshot>
where
    F: QuestionSource,
    S: KeyValueStore,
{
    if let Some(context) = cached {
        return Ok(orchestrator.snapshot(tags, context));
    }

    let timeline = orchestrator
        .timeline(tags)
        .inspect_err(|err| {
            tracing::error!(error = %err, kind = ?err.kind(), tags = %tags.label(), "one-shot refresh failed");
        })
        .context("failed to fetch featured questions")?;

    Ok(timeline.entries.into_iter().next().unwrap_or_else(|| orchestrator.placeholder()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ MemoryStore, CACHE_KEY };
    use crate::error::FetchError;
    use crate::models::{ placeholder_items, Avatar, ItemsResult, Owner, QuestionItem };
    use image::{ DynamicImage, Rgb, RgbImage };
    use std::sync::atomic::{ AtomicUsize, Ordering };
    use std::sync::mpsc;

    /// Serves one question with an avatar, or fails every item fetch.
    #[derive(Default)]
    struct CountingSource {
        fail: bool,
        image_calls: AtomicUsize,
    }

    impl QuestionSource for CountingSource {
        fn fetch_items(&self, tags: &TagSet) -> Result<ItemsResult, FetchError> {
            if self.fail {
                return Err(FetchError::EmptyBody);
            }
            Ok(ItemsResult { items: vec![question("fresh")], requested_tags: Some(tags.clone()) })
        }

        fn fetch_image(&self, _url: &str) -> Result<Avatar, FetchError> {
            self.image_calls.fetch_add(1, Ordering::SeqCst);
            Ok(Avatar(DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([9, 9, 9])))))
        }
    }

    fn question(title: &str) -> QuestionItem {
        QuestionItem {
            owner: Some(Owner {
                profile_image: Some("https://example.com/a.png".to_string()),
                display_name: Some("N".to_string()),
            }),
            title: Some(title.to_string()),
            ..QuestionItem::default()
        }
    }

    fn orchestrator_image_calls(orchestrator: &Orchestrator<CountingSource, MemoryStore>) -> usize {
        orchestrator.source().image_calls.load(Ordering::SeqCst)
    }

    fn seeded_store(tags: &TagSet) -> MemoryStore {
        let store = MemoryStore::default();
        let cached = ItemsResult { items: vec![question("cached")], requested_tags: Some(tags.clone()) };
        store.set(CACHE_KEY, &serde_json::to_vec(&cached).unwrap()).unwrap();
        store
    }

    fn app() -> App {
        App::new(TagSet::new(["rust"]), Snapshot::new(Some(placeholder_items()), None))
    }

    fn timeline_with(tags: &[&str], refresh_after: DateTime<Utc>) -> Timeline {
        let items = ItemsResult { items: vec![], requested_tags: Some(TagSet::new(tags.iter().copied())) };
        Timeline { entries: vec![Snapshot::new(Some(items), None)], refresh_after }
    }

    #[test]
    fn refresh_due_immediately_on_start() {
        let app = app();
        assert!(app.refresh_due(Utc::now() + Duration::seconds(1)));
    }

    #[test]
    fn timeline_success_schedules_next_refresh() {
        let mut app = app();
        let now = Utc::now();
        app.in_flight = true;
        app.on_update(Update::Timeline(Ok(timeline_with(&["rust"], now + Duration::minutes(5)))), now);

        assert!(!app.in_flight);
        assert_eq!(app.next_refresh, now + Duration::minutes(5));
        assert_eq!(app.last_refresh, Some(now));
        assert!(!app.refresh_due(now + Duration::minutes(4)));
        assert!(app.refresh_due(now + Duration::minutes(5)));
        assert!(app.snapshot.items.as_ref().unwrap().is_empty());
    }

    #[test]
    fn timeline_failure_keeps_previous_snapshot() {
        let mut app = app();
        let now = Utc::now();
        let before = app.snapshot.clone();
        app.in_flight = true;
        app.on_update(Update::Timeline(Err("request failed".to_string())), now);

        assert_eq!(app.snapshot, before);
        assert_eq!(app.last_error.as_deref(), Some("request failed"));
        assert_eq!(app.next_refresh, now + Duration::minutes(5));
        assert!(!app.in_flight);
    }

    #[test]
    fn cached_snapshot_does_not_override_fresh_timeline() {
        let mut app = app();
        let now = Utc::now();
        app.on_update(Update::Timeline(Ok(timeline_with(&["rust"], now))), now);
        app.on_update(Update::Snapshot(Snapshot::new(Some(placeholder_items()), None)), now);
        assert!(app.snapshot.items.as_ref().unwrap().is_empty());
    }

    #[test]
    fn manual_refresh_ignored_while_in_flight() {
        let mut app = app();
        let now = Utc::now();
        app.next_refresh = now + Duration::minutes(5);
        app.in_flight = true;
        app.on_refresh_requested(now);
        assert_eq!(app.next_refresh, now + Duration::minutes(5));

        app.in_flight = false;
        app.on_refresh_requested(now);
        assert!(app.refresh_due(now));
    }

    #[test]
    fn first_cycle_preview_skips_avatar_download() {
        let tags = TagSet::new(["rust"]);
        let orchestrator = Arc::new(Orchestrator::new(CountingSource::default(), seeded_store(&tags)));
        let mut app = App::new(tags, orchestrator.placeholder());
        let (tx, rx) = mpsc::channel();

        app.start_refresh(&orchestrator, &tx);

        match rx.recv().unwrap() {
            Update::Snapshot(snapshot) => {
                assert_eq!(snapshot.first_item().unwrap().title.as_deref(), Some("cached"));
                assert!(snapshot.avatar.is_none());
            }
            Update::Timeline(_) => panic!("expected the cached snapshot first"),
        }
        match rx.recv().unwrap() {
            Update::Timeline(Ok(timeline)) => assert!(timeline.entries[0].avatar.is_some()),
            _ => panic!("expected a successful timeline"),
        }
        assert_eq!(orchestrator_image_calls(&orchestrator), 1);
    }

    #[test]
    fn once_snapshot_propagates_fetch_failure() {
        let tags = TagSet::new(["rust"]);
        let source = CountingSource { fail: true, ..CountingSource::default() };
        let orchestrator = Orchestrator::new(source, seeded_store(&tags));

        let err = once_snapshot(&orchestrator, &tags, None).unwrap_err();
        assert!(err.to_string().contains("failed to fetch featured questions"));
    }

    #[test]
    fn once_snapshot_reads_cache_when_asked() {
        let tags = TagSet::new(["rust"]);
        let source = CountingSource { fail: true, ..CountingSource::default() };
        let orchestrator = Orchestrator::new(source, seeded_store(&tags));

        let snapshot = once_snapshot(&orchestrator, &tags, Some(Context { is_preview: true })).unwrap();
        assert_eq!(snapshot.first_item().unwrap().title.as_deref(), Some("cached"));
        assert!(snapshot.avatar.is_none());
    }

    #[test]
    fn once_snapshot_fetches_fresh_entry() {
        let tags = TagSet::new(["rust"]);
        let orchestrator = Orchestrator::new(CountingSource::default(), seeded_store(&tags));

        let snapshot = once_snapshot(&orchestrator, &tags, None).unwrap();
        assert_eq!(snapshot.first_item().unwrap().title.as_deref(), Some("fresh"));
        assert!(snapshot.avatar.is_some());
    }
}
