//! Widget configuration loaded from environment variables.

use std::path::PathBuf;

use anyhow::Context as _;
use url::Url;

use crate::models::TagSet;

const DEFAULT_SITE: &str = "stackoverflow";
const DEFAULT_API_URL: &str = "https://api.stackexchange.com/2.2/";

#[derive(Debug, Clone)]
pub struct Config {
    /// Tags used when none are given on the command line.
    pub tags: TagSet,

    /// Stack Exchange site id, e.g. "stackoverflow" or "superuser".
    pub site: String,

    /// API base; always ends with `/` so endpoints can be joined onto it.
    pub api_base: Url,

    /// Directory holding the cache slot and the TUI log file.
    pub cache_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// - `BOUNTY_TAGS`: `;`-separated default tags (default: unfiltered)
    /// - `BOUNTY_SITE`: site id (default: "stackoverflow")
    /// - `BOUNTY_API_URL`: API base (default: "https://api.stackexchange.com/2.2/")
    /// - `BOUNTY_CACHE_DIR`: cache directory (default: the platform cache dir + `bounty-widget`)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), dirs::cache_dir())
    }

    /// `platform_cache` is the user cache directory, if the platform has one.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        platform_cache: Option<PathBuf>
    ) -> anyhow::Result<Self> {
        let tags = lookup("BOUNTY_TAGS").map(|raw| TagSet::parse(&raw)).unwrap_or_default();

        let site = lookup("BOUNTY_SITE")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SITE.to_string());

        let mut raw_base = lookup("BOUNTY_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        if !raw_base.ends_with('/') {
            raw_base.push('/');
        }
        let api_base = Url::parse(&raw_base).with_context(|| format!("invalid BOUNTY_API_URL: {raw_base}"))?;

        let cache_dir = lookup("BOUNTY_CACHE_DIR")
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .or_else(|| platform_cache.map(|dir| dir.join("bounty-widget")))
            .unwrap_or_else(|| PathBuf::from(".bounty-widget"));

        Ok(Self { tags, site, api_base, cache_dir })
    }
}
