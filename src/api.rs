use crate::error::FetchError;
use crate::models::{ Avatar, ItemsResult, QuestionsResponse, TagSet };
use reqwest::blocking::{ Client, Response };
use reqwest::header;
use url::Url;

const USER_AGENT: &str = "bounty-widget/0.1";

/// Where featured questions and avatars come from.
pub trait QuestionSource: Send + Sync {
    /// Most recently active featured question for `tags`, stamped with `tags`.
    fn fetch_items(&self, tags: &TagSet) -> Result<ItemsResult, FetchError>;

    fn fetch_image(&self, url: &str) -> Result<Avatar, FetchError>;
}

pub struct StackExchangeClient {
    client: Client,
    endpoint: Url,
    site: String,
}

impl StackExchangeClient {
    pub fn new(api_base: &Url, site: &str) -> anyhow::Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::USER_AGENT, header::HeaderValue::from_static(USER_AGENT));

        let client = Client::builder().default_headers(headers).gzip(true).build()?;

        Ok(Self {
            client,
            endpoint: api_base.join("questions/featured")?,
            site: site.to_string(),
        })
    }

    pub fn featured_url(&self, tags: &TagSet) -> Url {
        featured_url(&self.endpoint, &self.site, tags)
    }
}

/// Page 1, one item, sorted by activity. `tagged` is left out when unfiltered.
pub fn featured_url(endpoint: &Url, site: &str, tags: &TagSet) -> Url {
    let mut url = endpoint.clone();
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("page", "1")
            .append_pair("pagesize", "1")
            .append_pair("order", "desc")
            .append_pair("sort", "activity");
        if !tags.is_empty() {
            query.append_pair("tagged", &tags.tagged_param());
        }
        query.append_pair("site", site);
    }
    url
}

impl QuestionSource for StackExchangeClient {
    fn fetch_items(&self, tags: &TagSet) -> Result<ItemsResult, FetchError> {
        let url = self.featured_url(tags);
        tracing::debug!(url = %url, "fetching featured questions");

        let resp = check_status(self.client.get(url).send()?)?;
        let body = resp.bytes()?;
        decode_items(&body, tags)
    }

    fn fetch_image(&self, url: &str) -> Result<Avatar, FetchError> {
        tracing::debug!(url, "fetching avatar");

        let resp = check_status(self.client.get(url).send()?)?;
        let body = resp.bytes()?;
        decode_avatar(&body)
    }
}

/// A redirect left unfollowed carries neither data nor an error.
fn check_status(resp: Response) -> Result<Response, FetchError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else if status.is_redirection() {
        Err(FetchError::Unknown)
    } else {
        Err(FetchError::Status(status))
    }
}

/// Decodes a featured-questions payload and stamps it with the tags it was
/// requested for. Anything past the first item is dropped.
pub fn decode_items(body: &[u8], tags: &TagSet) -> Result<ItemsResult, FetchError> {
    if body.is_empty() {
        return Err(FetchError::EmptyBody);
    }

    let response: QuestionsResponse = serde_json::from_slice(body)?;
    tracing::debug!(
        items = response.items.len(),
        has_more = response.has_more,
        quota_remaining = ?response.quota_remaining,
        "decoded featured questions"
    );

    let mut items = response.items;
    items.truncate(1);

    Ok(ItemsResult {
        items,
        requested_tags: Some(tags.clone()),
    })
}

pub fn decode_avatar(body: &[u8]) -> Result<Avatar, FetchError> {
    if body.is_empty() {
        return Err(FetchError::EmptyBody);
    }
    Ok(Avatar(image::load_from_memory(body)?))
}
