//! Defines the content types fetched from the CMS: [`ContentItem`] (a post as
//! it appears in listings), [`Post`] (a full post document) and the rich-text
//! pieces a post body is made of. Both [`ContentItem`] and [`Post`] are
//! deserialized from the CMS's raw [`Document`] shape.

use crate::format::{self, InvalidDate};
use serde::{Deserialize, Deserializer};

/// The CMS document type for blog posts.
pub const POST_TYPE: &str = "post";

/// Returns the site-relative path of the page for the post with `uid`, e.g.
/// `post/hello-world.html`.
pub fn post_path(uid: &str) -> String {
    format!("post/{}.html", uid)
}

/// A post as it appears in a listing. Only the fields needed to render an
/// index entry are kept.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(from = "Document")]
pub struct ContentItem {
    /// The CMS document ID. Unique and stable.
    pub id: String,

    /// The human-readable slug. Documents without one can't be linked to.
    pub uid: Option<String>,

    /// The first publication timestamp, as sent by the CMS. `None` for
    /// documents that have never been published (e.g., drafts in preview).
    pub published_at: Option<String>,

    pub title: String,
    pub subtitle: String,
    pub author: String,
}

impl ContentItem {
    /// Formats [`ContentItem::published_at`] with [`format::format_date`].
    pub fn display_date(&self) -> Result<String, InvalidDate> {
        match &self.published_at {
            Some(timestamp) => format::format_date(timestamp),
            None => Err(InvalidDate::Missing),
        }
    }
}

impl From<Document> for ContentItem {
    fn from(doc: Document) -> ContentItem {
        ContentItem {
            id: doc.id,
            uid: doc.uid,
            published_at: doc.first_publication_date,
            title: doc.data.title,
            subtitle: doc.data.subtitle,
            author: doc.data.author,
        }
    }
}

/// A full post document.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(from = "Document")]
pub struct Post {
    pub id: String,
    pub uid: Option<String>,
    pub first_publication_date: Option<String>,
    pub last_publication_date: Option<String>,
    pub title: String,
    pub subtitle: String,
    pub author: String,

    /// The banner image URL. Taken from the `banner` field, falling back to
    /// the `image` field.
    pub banner: Option<String>,

    pub content: Vec<Section>,
}

impl Post {
    /// Estimates how many minutes it takes to read the post body. Headings are
    /// not counted.
    pub fn reading_time(&self) -> u32 {
        format::reading_time_minutes(
            self.content.iter().flat_map(|section| section.body.iter()),
        )
    }
}

impl From<Document> for Post {
    fn from(doc: Document) -> Post {
        let data = doc.data;
        let banner = data
            .banner
            .and_then(|image| image.url)
            .or_else(|| data.image.and_then(|image| image.url));
        Post {
            id: doc.id,
            uid: doc.uid,
            first_publication_date: doc.first_publication_date,
            last_publication_date: doc.last_publication_date,
            title: data.title,
            subtitle: data.subtitle,
            author: data.author,
            banner,
            content: data.content,
        }
    }
}

/// A raw CMS document, as returned by the search API.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Document {
    pub id: String,

    #[serde(default)]
    pub uid: Option<String>,

    #[serde(default, rename = "type")]
    pub doc_type: String,

    #[serde(default)]
    pub first_publication_date: Option<String>,

    #[serde(default)]
    pub last_publication_date: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub data: DocumentData,
}

/// The custom fields of a post [`Document`]. Depending on the query's `fetch`
/// option, any of them may be absent.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct DocumentData {
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,

    #[serde(deserialize_with = "null_as_default")]
    pub subtitle: String,

    #[serde(deserialize_with = "null_as_default")]
    pub author: String,

    pub banner: Option<ImageField>,

    pub image: Option<ImageField>,

    #[serde(deserialize_with = "null_as_default")]
    pub content: Vec<Section>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ImageField {
    #[serde(default)]
    pub url: Option<String>,
}

/// A titled group of rich-text blocks.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Section {
    #[serde(deserialize_with = "null_as_default")]
    pub heading: String,

    #[serde(deserialize_with = "null_as_default")]
    pub body: Vec<TextBlock>,
}

/// A single rich-text block (paragraph, heading, list item, image...).
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TextBlock {
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub kind: String,

    #[serde(deserialize_with = "null_as_default")]
    pub text: String,

    #[serde(deserialize_with = "null_as_default")]
    pub spans: Vec<Span>,

    /// Only set for `image` blocks.
    pub url: Option<String>,

    /// Only set for `image` blocks.
    pub alt: Option<String>,
}

impl TextBlock {
    /// Creates an unstyled paragraph block.
    pub fn paragraph(text: impl Into<String>) -> TextBlock {
        TextBlock {
            kind: String::from("paragraph"),
            text: text.into(),
            ..TextBlock::default()
        }
    }
}

/// Inline styling applied to the characters `start..end` of a [`TextBlock`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,

    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub data: Option<SpanData>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SpanData {
    /// Target of a `hyperlink` span.
    pub url: Option<String>,

    /// Class name of a `label` span.
    pub label: Option<String>,
}

/// A link to another post, shown in the previous/next navigation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostLink {
    pub uid: String,
    pub title: String,
}

impl PostLink {
    /// Returns `None` when `item` has no UID and so can't be linked to.
    pub fn from_item(item: &ContentItem) -> Option<PostLink> {
        item.uid.as_ref().map(|uid| PostLink {
            uid: uid.clone(),
            title: item.title.clone(),
        })
    }
}

/// The posts published immediately before and after a given post.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Adjacent {
    pub prev: Option<PostLink>,
    pub next: Option<PostLink>,
}

// The CMS sends `null` for empty fields rather than omitting them.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
