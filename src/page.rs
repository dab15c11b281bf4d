//! Incremental "load more" pagination over a remote listing. A [`ListState`]
//! starts from the first [`Page`] (fetched by whoever renders the listing) and
//! grows by following each page's cursor, an absolute URL handed out by the
//! previous response.

use crate::client::Error as FetchError;
use crate::post::ContentItem;
use serde::{Deserialize, Deserializer};
use std::future::Future;
use tracing::debug;

/// One page of a remote listing, in server order.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Page<T = ContentItem> {
    #[serde(rename = "results")]
    pub items: Vec<T>,

    /// The absolute URL of the following page. `None` on the last page; an
    /// empty string is treated the same way.
    #[serde(rename = "next_page", default, deserialize_with = "cursor")]
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_cursor: Option<String>) -> Page<T> {
        Page {
            items,
            next_cursor: normalize_cursor(next_cursor),
        }
    }
}

/// Fetches listing pages by their absolute URL.
pub trait PageSource {
    fn fetch_page(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<Page, FetchError>> + Send;
}

/// The items loaded so far for a listing, plus the cursor for the next page.
/// Items are only ever appended, in the order the server returned them;
/// nothing is de-duplicated or re-sorted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListState {
    items: Vec<ContentItem>,
    cursor: Option<String>,
}

impl ListState {
    /// Starts a listing from its first page.
    pub fn new(page: Page) -> ListState {
        ListState {
            items: page.items,
            cursor: normalize_cursor(page.next_cursor),
        }
    }

    pub fn items(&self) -> &[ContentItem] {
        &self.items
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// Whether another page can be loaded.
    pub fn has_more(&self) -> bool {
        self.cursor.is_some()
    }

    /// Fetches the page behind the cursor and appends its items. Does nothing
    /// (and fetches nothing) once the listing is exhausted.
    ///
    /// The state is only touched after the page has been fetched and decoded,
    /// so on error it keeps its previous items and cursor. There is no retry.
    pub async fn load_more<S: PageSource>(
        &mut self,
        source: &S,
    ) -> Result<(), FetchError> {
        let cursor = match &self.cursor {
            Some(cursor) => cursor,
            None => return Ok(()),
        };
        debug!(cursor = %cursor, "loading next page");
        let page = source.fetch_page(cursor).await?;
        debug!(
            loaded = self.items.len(),
            fetched = page.items.len(),
            "merging page"
        );
        self.items.extend(page.items);
        self.cursor = normalize_cursor(page.next_cursor);
        Ok(())
    }
}

impl From<Page> for ListState {
    fn from(page: Page) -> ListState {
        ListState::new(page)
    }
}

fn normalize_cursor(cursor: Option<String>) -> Option<String> {
    cursor.filter(|cursor| !cursor.trim().is_empty())
}

fn cursor<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(normalize_cursor(Option::<String>::deserialize(deserializer)?))
}
