use std::fmt;

use url::Url;

/// Which extraction path a fetched page takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestRole {
    Listing,
    Detail,
}

impl RequestRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestRole::Listing => "LISTING",
            RequestRole::Detail => "DETAIL",
        }
    }
}

impl fmt::Display for RequestRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A unit of work in a run's frontier.
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlRequest {
    pub url: Url,
    pub role: RequestRole,
    /// The page that enqueued this request; `None` for the seed.
    pub origin: Option<Url>,
    /// Number of failed attempts so far.
    pub retries: u32,
}

impl CrawlRequest {
    pub fn seed(url: Url) -> Self {
        Self {
            url,
            role: RequestRole::Listing,
            origin: None,
            retries: 0,
        }
    }

    pub fn detail(url: Url, origin: &Url) -> Self {
        Self {
            url,
            role: RequestRole::Detail,
            origin: Some(origin.clone()),
            retries: 0,
        }
    }

    /// Key used to enforce one fetch per URL within a run.
    ///
    /// Fragments never change what the server returns, so they are dropped.
    pub fn unique_key(&self) -> String {
        unique_key(&self.url)
    }
}

pub(crate) fn unique_key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.into()
}
