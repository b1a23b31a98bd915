//! This client fetches the club's RSS feed and parses it into feed items.

use std::{
    fmt::{Display, Formatter},
    io::Cursor,
    path::PathBuf,
};

use chrono::{DateTime, FixedOffset};
use reqwest::Url;
use rss::Channel;
use thiserror::Error;
use tracing::{debug, info};

/// The official FC St. Pauli news feed.
pub static DEFAULT_FEED_URL: &str = "https://www.fcstpauli.com/rss.xml";

/// Errors which abort a run, there is no partial output after any of these.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Connection, TLS or body transfer failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The server answered with a non-2xx status.
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// A local feed file could not be read.
    #[error("could not read feed file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The document is not a valid RSS channel.
    #[error("could not parse feed: {0}")]
    Parse(#[from] rss::Error),
    #[error("invalid feed source: {0}")]
    InvalidSource(String),
}

/// Where the feed is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    Url(Url),
    File(PathBuf),
}

impl FeedSource {
    /// Interpret `http`/`https` URLs as remote feeds and everything else as a file path.
    pub fn parse(source: &str) -> Result<Self, FeedError> {
        match Url::parse(source) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Self::Url(url)),
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map(Self::File)
                .map_err(|_| FeedError::InvalidSource(source.to_string())),
            // single letters are windows drive prefixes like `C:\feed.xml`
            Ok(url) if url.scheme().len() > 1 => {
                Err(FeedError::InvalidSource(source.to_string()))
            }
            _ if source.trim().is_empty() => Err(FeedError::InvalidSource(source.to_string())),
            _ => Ok(Self::File(PathBuf::from(source))),
        }
    }
}

impl Display for FeedSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedSource::Url(url) => write!(f, "{url}"),
            FeedSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A single RSS item, as read from the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub description: String,
    pub link: String,
    pub published: Option<DateTime<FixedOffset>>,
}

/// Fetch the feed once and parse its items.
pub async fn fetch(source: &FeedSource) -> Result<Vec<FeedItem>, FeedError> {
    info!("Fetching RSS feed from {source}");
    let body = match source {
        FeedSource::Url(url) => get_body(url.clone()).await?,
        FeedSource::File(path) => std::fs::read(path).map_err(|source| FeedError::Read {
            path: path.clone(),
            source,
        })?,
    };
    let items = parse(&body)?;
    info!("Found {} entries in feed", items.len());
    Ok(items)
}

/// Get the raw feed document from the club's server.
async fn get_body(url: Url) -> Result<Vec<u8>, FeedError> {
    let response = reqwest::get(url).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FeedError::HttpStatus(status.as_u16()));
    }
    Ok(response.bytes().await?.to_vec())
}

/// Parse an RSS document into feed items, keeping the feed order.
pub fn parse(document: &[u8]) -> Result<Vec<FeedItem>, FeedError> {
    let channel = Channel::read_from(Cursor::new(document))?;
    let items = channel
        .items()
        .iter()
        .map(|item| {
            let title = item.title().unwrap_or_default().to_string();
            let published = item.pub_date().and_then(|pub_date| {
                DateTime::parse_from_rfc2822(pub_date)
                    .map_err(|err| debug!("Unparseable pubDate {pub_date:?} in {title:?}: {err}"))
                    .ok()
            });
            FeedItem {
                description: item.description().unwrap_or_default().to_string(),
                link: item.link().unwrap_or_default().to_string(),
                published,
                title,
            }
        })
        .collect();
    Ok(items)
}
