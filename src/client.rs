//! An HTTP client for the CMS's document API. Documents are looked up with
//! [`Query`]s built from [`Predicate`]s and are always read at a specific
//! content ref: the master ref for published content, or a preview ref.

use crate::page::{Page, PageSource};
use crate::post::{Adjacent, ContentItem, Document, Post, PostLink, POST_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use tracing::debug;
use url::Url;

const PUBLICATION_DATE: &str = "document.first_publication_date";

/// A condition documents must satisfy to be returned by a [`Query`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Predicate {
    /// The field at the path equals the value.
    At(String, String),

    /// The date field at the path is after the timestamp.
    DateAfter(String, String),

    /// The date field at the path is before the timestamp.
    DateBefore(String, String),
}

impl Predicate {
    pub fn at(path: &str, value: &str) -> Predicate {
        Predicate::At(path.to_owned(), value.to_owned())
    }

    pub fn date_after(path: &str, timestamp: &str) -> Predicate {
        Predicate::DateAfter(path.to_owned(), timestamp.to_owned())
    }

    pub fn date_before(path: &str, timestamp: &str) -> Predicate {
        Predicate::DateBefore(path.to_owned(), timestamp.to_owned())
    }
}

impl fmt::Display for Predicate {
    /// Renders the predicate in the API's query syntax, e.g.
    /// `[at(document.type,"post")]`.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Predicate::At(path, value) => write!(f, "[at({},{})]", path, quote(value)),
            Predicate::DateAfter(path, timestamp) => {
                write!(f, "[date.after({},{})]", path, quote(timestamp))
            }
            Predicate::DateBefore(path, timestamp) => {
                write!(f, "[date.before({},{})]", path, quote(timestamp))
            }
        }
    }
}

// Wraps a predicate value in double quotes, backslash-escaping `"` and `\`.
fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// A document search.
#[derive(Clone, Debug, Default)]
pub struct Query {
    predicates: Vec<Predicate>,
    page_size: Option<usize>,
    fetch: Vec<String>,
    orderings: Vec<String>,
}

impl Query {
    pub fn new() -> Query {
        Query::default()
    }

    pub fn predicate(mut self, predicate: Predicate) -> Query {
        self.predicates.push(predicate);
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Query {
        self.page_size = Some(page_size);
        self
    }

    /// Restricts the returned document data to `field` (and any other fields
    /// passed to `fetch`), e.g. `post.title`.
    pub fn fetch(mut self, field: &str) -> Query {
        self.fetch.push(field.to_owned());
        self
    }

    pub fn order_by(mut self, field: &str, descending: bool) -> Query {
        self.orderings.push(match descending {
            true => format!("{} desc", field),
            false => field.to_owned(),
        });
        self
    }

    /// The `q` parameter: every predicate wrapped in one more pair of
    /// brackets, e.g. `[[at(document.type,"post")][date.after(...)]]`.
    pub fn q(&self) -> String {
        let predicates: String =
            self.predicates.iter().map(|p| p.to_string()).collect();
        format!("[{}]", predicates)
    }

    fn params(
        &self,
        reference: &str,
        access_token: Option<&str>,
    ) -> Vec<(&'static str, String)> {
        let mut params = vec![("ref", reference.to_owned()), ("q", self.q())];
        if let Some(page_size) = self.page_size {
            params.push(("pageSize", page_size.to_string()));
        }
        if !self.fetch.is_empty() {
            params.push(("fetch", self.fetch.join(",")));
        }
        if !self.orderings.is_empty() {
            params.push(("orderings", format!("[{}]", self.orderings.join(","))));
        }
        if let Some(token) = access_token {
            params.push(("access_token", token.to_owned()));
        }
        params
    }
}

/// The CMS API client. Cloning is cheap; clones share the connection pool.
#[derive(Clone, Debug)]
pub struct Client {
    http: reqwest::Client,

    /// The API entry point, e.g. `https://my-blog.cdn.prismic.io/api/v2`.
    endpoint: Url,

    access_token: Option<String>,

    /// The content ref to read at. Resolved to the master ref on each query
    /// when unset.
    reference: Option<String>,
}

impl Client {
    pub fn new(endpoint: Url, access_token: Option<String>) -> Client {
        Client {
            http: reqwest::Client::new(),
            endpoint,
            access_token,
            reference: None,
        }
    }

    /// Pins the client to a content ref, e.g. a preview token.
    pub fn with_ref(mut self, reference: impl Into<String>) -> Client {
        self.reference = Some(reference.into());
        self
    }

    /// Looks up the ref of the currently published content.
    pub async fn master_ref(&self) -> Result<String> {
        #[derive(Deserialize)]
        struct Api {
            refs: Vec<Ref>,
        }

        #[derive(Deserialize)]
        struct Ref {
            #[serde(rename = "ref")]
            reference: String,

            #[serde(default, rename = "isMasterRef")]
            is_master_ref: bool,
        }

        let mut params = Vec::new();
        if let Some(token) = &self.access_token {
            params.push(("access_token", token.clone()));
        }
        let api: Api = self.get(self.endpoint.clone(), &params).await?;
        api.refs
            .into_iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.reference)
            .ok_or(Error::MissingMasterRef)
    }

    async fn reference(&self) -> Result<String> {
        match &self.reference {
            Some(reference) => Ok(reference.clone()),
            None => self.master_ref().await,
        }
    }

    /// Runs a document search and returns the first page of results.
    pub async fn query<T: DeserializeOwned>(&self, query: &Query) -> Result<Page<T>> {
        let reference = self.reference().await?;
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| Error::CannotBeABase(self.endpoint.clone()))?
            .pop_if_empty()
            .extend(&["documents", "search"]);
        self.get(url, &query.params(&reference, self.access_token.as_deref()))
            .await
    }

    /// Fetches the first page of the post listing, newest first, with only
    /// the fields a listing shows.
    pub async fn posts_page(&self, page_size: usize) -> Result<Page> {
        self.query(
            &Query::new()
                .predicate(Predicate::at("document.type", POST_TYPE))
                .fetch("post.title")
                .fetch("post.subtitle")
                .fetch("post.author")
                .order_by(PUBLICATION_DATE, true)
                .page_size(page_size),
        )
        .await
    }

    /// Fetches a document of type `doc_type` by its UID.
    pub async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<Option<Post>> {
        let page: Page<Post> = self
            .query(
                &Query::new()
                    .predicate(Predicate::at(&format!("my.{}.uid", doc_type), uid))
                    .page_size(1),
            )
            .await?;
        Ok(page.items.into_iter().next())
    }

    /// Fetches any document by its ID.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Document>> {
        let page: Page<Document> = self
            .query(
                &Query::new()
                    .predicate(Predicate::at("document.id", id))
                    .page_size(1),
            )
            .await?;
        Ok(page.items.into_iter().next())
    }

    /// Finds the posts published immediately before and after
    /// `published_at`. A post that was never published has no neighbours.
    pub async fn adjacent_posts(&self, published_at: Option<&str>) -> Result<Adjacent> {
        let published_at = match published_at {
            Some(published_at) => published_at,
            None => return Ok(Adjacent::default()),
        };

        let neighbour = |predicate: Predicate, descending: bool| {
            Query::new()
                .predicate(Predicate::at("document.type", POST_TYPE))
                .predicate(predicate)
                .fetch("post.title")
                .order_by(PUBLICATION_DATE, descending)
                .page_size(1)
        };

        let next: Page = self
            .query(&neighbour(
                Predicate::date_after(PUBLICATION_DATE, published_at),
                false,
            ))
            .await?;
        let prev: Page = self
            .query(&neighbour(
                Predicate::date_before(PUBLICATION_DATE, published_at),
                true,
            ))
            .await?;

        Ok(Adjacent {
            prev: prev.items.first().and_then(PostLink::from_item),
            next: next.items.first().and_then(PostLink::from_item),
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        url: Url,
        params: &[(&str, String)],
    ) -> Result<T> {
        debug!(url = %url, "GET");
        let response = self.http.get(url.clone()).query(params).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                url: url.to_string(),
                status,
            });
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

impl PageSource for Client {
    /// Fetches a listing page by the absolute URL from a previous page's
    /// `next_page`. The URL already carries the ref and any token.
    async fn fetch_page(&self, url: &str) -> Result<Page<ContentItem>> {
        let url = Url::parse(url).map_err(|err| Error::InvalidUrl {
            url: url.to_owned(),
            err,
        })?;
        self.get(url, &[]).await
    }
}

/// The result of a CMS request.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failed CMS request.
#[derive(Debug)]
pub enum Error {
    /// Returned when the request couldn't be sent or the response couldn't
    /// be read.
    Http(reqwest::Error),

    /// Returned for non-success HTTP statuses.
    Status { url: String, status: StatusCode },

    /// Returned when the response body isn't the expected JSON.
    Decode(serde_json::Error),

    /// Returned when a page cursor isn't a valid absolute URL.
    InvalidUrl { url: String, err: url::ParseError },

    /// Returned when the API endpoint can't have path segments appended.
    CannotBeABase(Url),

    /// Returned when the API doesn't advertise a master ref.
    MissingMasterRef,
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Http(err) => err.fmt(f),
            Error::Status { url, status } => {
                write!(f, "Fetching `{}`: HTTP {}", url, status)
            }
            Error::Decode(err) => write!(f, "Decoding response: {}", err),
            Error::InvalidUrl { url, err } => {
                write!(f, "Invalid page URL `{}`: {}", url, err)
            }
            Error::CannotBeABase(url) => {
                write!(f, "API endpoint `{}` can't be used as a base URL", url)
            }
            Error::MissingMasterRef => write!(f, "API has no master ref"),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Http(err) => Some(err),
            Error::Status { .. } => None,
            Error::Decode(err) => Some(err),
            Error::InvalidUrl { url: _, err } => Some(err),
            Error::CannotBeABase(_) => None,
            Error::MissingMasterRef => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    /// Converts a [`reqwest::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator when sending requests and reading responses.
    fn from(err: reqwest::Error) -> Error {
        Error::Http(err)
    }
}

impl From<serde_json::Error> for Error {
    /// Converts a [`serde_json::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator when decoding response bodies.
    fn from(err: serde_json::Error) -> Error {
        Error::Decode(err)
    }
}
