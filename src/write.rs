use crate::config::Comments;
use crate::format::{self, InvalidDate};
use crate::page::ListState;
use crate::post::{post_path, Adjacent, ContentItem, Post, PostLink};
use crate::richtext;
use crate::value;
use gtmpl::{Context, Template, Value};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use url::Url;

/// Everything the post template needs: the post, its neighbours, and whether
/// it is being rendered from preview content.
#[derive(Clone, Debug)]
pub struct PostPage {
    pub post: Post,
    pub adjacent: Adjacent,
    pub preview: bool,
}

/// Responsible for templating and writing the index and post HTML pages to
/// disk.
pub struct Writer<'a> {
    /// The template for the index page.
    pub index_template: &'a Template,

    /// The template for post pages.
    pub post_template: &'a Template,

    /// The directory the site is written to. The index page is written to
    /// `{output_directory}/index.html` and post pages to
    /// `{output_directory}/post/{uid}.html`.
    pub output_directory: &'a Path,

    /// The site's root URL. Must end in a slash. It is made available to both
    /// templates as `home_page` and prefixes every post URL.
    pub site_root: &'a Url,

    /// Settings for the comment widget on post pages, if enabled.
    pub comments: Option<&'a Comments>,
}

impl Writer<'_> {
    /// Renders the index page from the listing's current items. The listing's
    /// cursor is exposed as `next_page` so the page can offer to load more.
    pub fn write_index(&self, listing: &ListState) -> Result<PathBuf> {
        let items = listing
            .items()
            .iter()
            .map(|item| self.item_value(item))
            .collect::<Result<Vec<Value>>>()?;

        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("items".to_owned(), Value::Array(items));
        m.insert("next_page".to_owned(), value::option(listing.cursor()));

        let file_path = self.output_directory.join("index.html");
        self.write_page(self.index_template, Value::Object(m), &file_path)?;
        Ok(file_path)
    }

    /// Renders a single post page.
    pub fn write_post(&self, page: &PostPage) -> Result<PathBuf> {
        let uid = page
            .post
            .uid
            .as_deref()
            .ok_or_else(|| Error::MissingUid(page.post.id.clone()))?;
        let file_path = self.output_directory.join(post_path(uid));
        self.write_page(self.post_template, self.post_value(page)?, &file_path)?;
        Ok(file_path)
    }

    /// Takes a template value, adds the site-wide fields, templates it, and
    /// writes the result to `file_path`.
    fn write_page(&self, template: &Template, mut page: Value, file_path: &Path) -> Result<()> {
        value::insert(&mut page, "home_page", value::url(self.site_root));
        if let Some(dir) = file_path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        template.execute(
            &mut std::fs::File::create(file_path)?,
            &Context::from(page)?,
        )?;
        Ok(())
    }

    fn post_url(&self, uid: &str) -> Result<Url> {
        Ok(self.site_root.join(&post_path(uid))?)
    }

    /// Converts a listing entry into `{id, uid, url, title, subtitle, author,
    /// date}`. `url` is nil for items without a UID; `date` is nil for items
    /// that were never published.
    fn item_value(&self, item: &ContentItem) -> Result<Value> {
        let url = match &item.uid {
            Some(uid) => value::url(&self.post_url(uid)?),
            None => Value::Nil,
        };
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("id".to_owned(), (&item.id).into());
        m.insert("uid".to_owned(), value::option(item.uid.as_ref()));
        m.insert("url".to_owned(), url);
        m.insert("title".to_owned(), (&item.title).into());
        m.insert("subtitle".to_owned(), (&item.subtitle).into());
        m.insert("author".to_owned(), (&item.author).into());
        let date = match item.display_date() {
            Ok(date) => date.into(),
            Err(InvalidDate::Missing) => Value::Nil,
            Err(err) => return Err(err.into()),
        };
        m.insert("date".to_owned(), date);
        Ok(Value::Object(m))
    }

    fn link_value(&self, link: Option<&PostLink>) -> Result<Value> {
        let link = match link {
            Some(link) => link,
            None => return Ok(Value::Nil),
        };
        let mut v = Value::from(link);
        value::insert(&mut v, "url", value::url(&self.post_url(&link.uid)?));
        Ok(v)
    }

    fn post_value(&self, page: &PostPage) -> Result<Value> {
        let post = &page.post;

        let mut sections = Vec::with_capacity(post.content.len());
        for section in &post.content {
            let mut m: HashMap<String, Value> = HashMap::new();
            m.insert("heading".to_owned(), (&section.heading).into());
            m.insert("html".to_owned(), richtext::to_html(&section.body)?.into());
            sections.push(Value::Object(m));
        }

        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("title".to_owned(), (&post.title).into());
        m.insert("subtitle".to_owned(), (&post.subtitle).into());
        m.insert("author".to_owned(), (&post.author).into());
        m.insert("banner".to_owned(), value::option(post.banner.as_ref()));
        m.insert(
            "date".to_owned(),
            value::option(published(
                post.first_publication_date.as_deref(),
                format::format_date,
            )?),
        );
        m.insert(
            "updated_at".to_owned(),
            value::option(published(
                post.last_publication_date.as_deref(),
                format::format_updated_at,
            )?),
        );
        m.insert(
            "reading_time".to_owned(),
            post.reading_time().to_string().into(),
        );
        m.insert("sections".to_owned(), Value::Array(sections));
        m.insert("prev".to_owned(), self.link_value(page.adjacent.prev.as_ref())?);
        m.insert("next".to_owned(), self.link_value(page.adjacent.next.as_ref())?);
        m.insert("preview".to_owned(), page.preview.into());
        m.insert("comments".to_owned(), value::option(self.comments));
        Ok(Value::Object(m))
    }
}

// Unpublished documents legitimately have no timestamps, so a missing one
// renders as nothing; a malformed one is still an error.
fn published(
    timestamp: Option<&str>,
    format: fn(&str) -> std::result::Result<String, InvalidDate>,
) -> Result<Option<String>> {
    match timestamp {
        Some(timestamp) => Ok(Some(format(timestamp)?)),
        None => Ok(None),
    }
}

/// The result of a fallible page-writing operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-writing operation.
#[derive(Debug)]
pub enum Error {
    /// An error during templating.
    Template(String),

    /// A timestamp that couldn't be formatted.
    Date(InvalidDate),

    /// A post URL that couldn't be built from the site root.
    Url(url::ParseError),

    /// A post without a UID can't be given a page.
    MissingUid(String),

    /// An error writing the output files.
    Io(io::Error),
}

impl From<io::Error> for Error {
    /// Converts an [`io::Error`] into an [`Error`]. This allows us to use the
    /// `?` operator for fallible I/O operations.
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<String> for Error {
    /// Converts a template error message ([`String`]) into an [`Error`]. This
    /// allows us to use the `?` operator for fallible template operations.
    fn from(err: String) -> Error {
        Error::Template(err)
    }
}

impl From<InvalidDate> for Error {
    fn from(err: InvalidDate) -> Error {
        Error::Date(err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Error {
        Error::Url(err)
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as presentable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Template(err) => err.fmt(f),
            Error::Date(err) => err.fmt(f),
            Error::Url(err) => err.fmt(f),
            Error::MissingUid(id) => write!(f, "post `{}` has no uid", id),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Template(_) => None,
            Error::Date(err) => Some(err),
            Error::Url(err) => Some(err),
            Error::MissingUid(_) => None,
            Error::Io(err) => Some(err),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::page::Page;
    use crate::post::{Section, TextBlock};

    fn template(text: &str) -> Template {
        let mut template = Template::default();
        template.parse(text).unwrap();
        template
    }

    fn item(uid: &str, title: &str) -> ContentItem {
        ContentItem {
            id: uid.to_uppercase(),
            uid: Some(uid.to_owned()),
            published_at: Some(String::from("2021-03-25T10:00:00+0000")),
            title: title.to_owned(),
            subtitle: String::from("sub"),
            author: String::from("Ada"),
        }
    }

    fn post(uid: Option<&str>) -> Post {
        Post {
            id: String::from("YF1"),
            uid: uid.map(str::to_owned),
            first_publication_date: Some(String::from("2021-03-25T10:00:00+0000")),
            last_publication_date: Some(String::from("2021-03-26T08:30:00+0000")),
            title: String::from("Hello"),
            subtitle: String::from("World"),
            author: String::from("Ada"),
            banner: None,
            content: vec![Section {
                heading: String::from("Intro"),
                body: vec![TextBlock::paragraph("a & b")],
            }],
        }
    }

    #[test]
    fn test_write_index() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let site_root = Url::parse("https://blog.example.com/").unwrap();
        let index_template = template(
            "{{.home_page}}|{{range .items}}{{.url}} {{.title}} {{.date}};{{end}}|{{if .next_page}}more{{end}}",
        );
        let post_template = template("");
        let writer = Writer {
            index_template: &index_template,
            post_template: &post_template,
            output_directory: dir.path(),
            site_root: &site_root,
            comments: None,
        };
        let listing = ListState::new(Page::new(
            vec![item("a", "A")],
            Some(String::from("https://cms.example.com/page/2")),
        ));

        let path = writer.write_index(&listing)?;

        assert_eq!(dir.path().join("index.html"), path);
        assert_eq!(
            "https://blog.example.com/|https://blog.example.com/post/a.html A 25 Mar 2021;|more",
            std::fs::read_to_string(path)?
        );
        Ok(())
    }

    #[test]
    fn test_write_index_unpublished_item_has_no_date() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let site_root = Url::parse("https://blog.example.com/").unwrap();
        let index_template =
            template("{{range .items}}{{.title}}:{{if .date}}{{.date}}{{else}}draft{{end}};{{end}}");
        let post_template = template("");
        let writer = Writer {
            index_template: &index_template,
            post_template: &post_template,
            output_directory: dir.path(),
            site_root: &site_root,
            comments: None,
        };
        let mut draft = item("b", "B");
        draft.published_at = None;
        let listing = ListState::new(Page::new(vec![item("a", "A"), draft], None));

        let path = writer.write_index(&listing)?;

        assert_eq!("A:25 Mar 2021;B:draft;", std::fs::read_to_string(path)?);
        Ok(())
    }

    #[test]
    fn test_write_index_rejects_malformed_dates() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let site_root = Url::parse("https://blog.example.com/").unwrap();
        let template = template("");
        let writer = Writer {
            index_template: &template,
            post_template: &template,
            output_directory: dir.path(),
            site_root: &site_root,
            comments: None,
        };
        let mut bad = item("a", "A");
        bad.published_at = Some(String::from("not a date"));

        match writer.write_index(&ListState::new(Page::new(vec![bad], None))) {
            Err(Error::Date(InvalidDate::Malformed(input))) => {
                assert_eq!("not a date", input)
            }
            other => panic!("wanted a date error, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_write_post() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let site_root = Url::parse("https://blog.example.com/").unwrap();
        let index_template = template("");
        let post_template = template(
            "{{.title}}|{{.date}}|{{.updated_at}}|{{.reading_time}} min|{{range .sections}}{{.heading}}:{{.html}}{{end}}|{{if .prev}}{{.prev.url}}{{end}}|{{if .next}}{{.next.url}}{{end}}|{{if .preview}}preview{{end}}",
        );
        let writer = Writer {
            index_template: &index_template,
            post_template: &post_template,
            output_directory: dir.path(),
            site_root: &site_root,
            comments: None,
        };
        let page = PostPage {
            post: post(Some("hello")),
            adjacent: Adjacent {
                prev: Some(PostLink {
                    uid: String::from("older"),
                    title: String::from("Older"),
                }),
                next: None,
            },
            preview: true,
        };

        let path = writer.write_post(&page)?;

        assert_eq!(dir.path().join("post").join("hello.html"), path);
        assert_eq!(
            "Hello|25 Mar 2021|* edited 26 Mar 2021, at 08:30|1 min|Intro:<p>a &amp; b</p>|https://blog.example.com/post/older.html||preview",
            std::fs::read_to_string(path)?
        );
        Ok(())
    }

    #[test]
    fn test_write_post_requires_uid() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let site_root = Url::parse("https://blog.example.com/").unwrap();
        let template = template("");
        let writer = Writer {
            index_template: &template,
            post_template: &template,
            output_directory: dir.path(),
            site_root: &site_root,
            comments: None,
        };
        let page = PostPage {
            post: post(None),
            adjacent: Adjacent::default(),
            preview: false,
        };

        match writer.write_post(&page) {
            Err(Error::MissingUid(id)) => assert_eq!("YF1", id),
            other => panic!("wanted a missing uid error, got {:?}", other),
        }
        Ok(())
    }
}
