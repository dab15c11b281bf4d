//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the static site: resolving the content ref, rendering the
//! first page of the post index, and rendering a page for every post
//! ([`crate::write`]) along with links to its neighbours.

use crate::client::{Client, Error as ClientError};
use crate::config::Config;
use crate::page::ListState;
use crate::post::POST_TYPE;
use crate::write::{Error as WriteError, *};
use gtmpl::Template;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// How many documents to request per page when enumerating every post.
const PATHS_PAGE_SIZE: usize = 20;

/// Builds the site from a [`Config`] object. Content is read at `reference`
/// when given (a preview ref, in which case pages are marked as previews) and
/// at the CMS's master ref otherwise.
pub async fn build_site(config: &Config, reference: Option<String>) -> Result<()> {
    let client = Client::new(config.api_endpoint.clone(), config.access_token.clone());
    let preview = reference.is_some();
    let reference = match reference {
        Some(reference) => reference,
        None => client.master_ref().await?,
    };
    info!(reference = %reference, preview, "building site");
    let client = client.with_ref(reference);

    // Parse the template files.
    let index_template = parse_template(config.index_template.iter())?;
    let post_template = parse_template(config.post_template.iter())?;

    // Blow away old post pages so posts that were unpublished since the last
    // build don't linger. The index page is simply overwritten.
    rmdir(&config.output_directory.join("post"))?;

    let writer = Writer {
        index_template: &index_template,
        post_template: &post_template,
        output_directory: &config.output_directory,
        site_root: &config.site_root,
        comments: config.comments.as_ref(),
    };

    let index = ListState::new(client.posts_page(config.index_page_size).await?);
    let path = writer.write_index(&index)?;
    info!(path = %path.display(), posts = index.items().len(), "wrote index page");

    let mut listing = ListState::new(client.posts_page(PATHS_PAGE_SIZE).await?);
    while listing.has_more() {
        listing.load_more(&client).await?;
    }

    for item in listing.items() {
        let uid = match &item.uid {
            Some(uid) => uid,
            None => {
                warn!(id = %item.id, "skipping post without a uid");
                continue;
            }
        };
        let post = match client.get_by_uid(POST_TYPE, uid).await? {
            Some(post) => post,
            None => {
                warn!(uid = %uid, "post disappeared during the build");
                continue;
            }
        };
        let adjacent = client
            .adjacent_posts(post.first_publication_date.as_deref())
            .await?;
        let path = writer.write_post(&PostPage {
            post,
            adjacent,
            preview,
        })?;
        info!(path = %path.display(), "wrote post page");
    }

    Ok(())
}

// Loads the template file contents, concatenates them, and parses the result
// into a template.
fn parse_template<P: AsRef<Path>>(template_files: impl Iterator<Item = P>) -> Result<Template> {
    let mut contents = String::new();
    for template_file in template_files {
        use std::io::Read;
        let template_file = template_file.as_ref();
        File::open(&template_file)
            .map_err(|e| Error::OpenTemplateFile {
                path: template_file.to_owned(),
                err: e,
            })?
            .read_to_string(&mut contents)?;
        contents.push(' ');
    }

    let mut template = Template::default();
    template.parse(&contents).map_err(Error::ParseTemplate)?;
    Ok(template)
}

fn rmdir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(x) => Ok(x),
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => Ok(()),
            _ => Err(Error::Clean {
                path: dir.to_owned(),
                err: e,
            }),
        },
    }
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can come from the CMS, from
/// writing pages, from cleaning output directories, from parsing template
/// files, and from other I/O.
#[derive(Debug)]
pub enum Error {
    /// Returned for failed CMS requests.
    Client(ClientError),

    /// Returned for errors rendering or writing pages.
    Write(WriteError),

    /// Returned for I/O problems while cleaning output directories.
    Clean { path: PathBuf, err: std::io::Error },

    /// Returned for I/O problems while opening template files.
    OpenTemplateFile { path: PathBuf, err: std::io::Error },

    /// Returned for errors parsing template files.
    ParseTemplate(String),

    /// Returned for other I/O errors.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Client(err) => err.fmt(f),
            Error::Write(err) => err.fmt(f),
            Error::Clean { path, err } => {
                write!(f, "Cleaning directory '{}': {}", path.display(), err)
            }
            Error::OpenTemplateFile { path, err } => {
                write!(f, "Opening template file '{}': {}", path.display(), err)
            }
            Error::ParseTemplate(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Client(err) => Some(err),
            Error::Write(err) => Some(err),
            Error::Clean { path: _, err } => Some(err),
            Error::OpenTemplateFile { path: _, err } => Some(err),
            Error::ParseTemplate(_) => None,
            Error::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<ClientError> for Error {
    /// Converts [`ClientError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: ClientError) -> Error {
        Error::Client(err)
    }
}

impl From<WriteError> for Error {
    /// Converts [`WriteError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: WriteError) -> Error {
        Error::Write(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_template_concatenates_files() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let base = dir.path().join("base.html");
        let index = dir.path().join("index.html");
        std::fs::write(&base, "{{define \"title\"}}Blog{{end}}")?;
        std::fs::write(&index, "<h1>{{template \"title\"}}</h1>")?;

        let template = parse_template([&base, &index].iter())?;
        let mut out: Vec<u8> = Vec::new();
        template.execute(&mut out, &gtmpl::Context::empty())?;

        assert_eq!("<h1>Blog</h1>", String::from_utf8(out)?.trim());
        Ok(())
    }

    #[test]
    fn test_parse_template_missing_file() {
        match parse_template([PathBuf::from("/nonexistent/vellum.html")].iter()) {
            Err(Error::OpenTemplateFile { path, .. }) => {
                assert_eq!(PathBuf::from("/nonexistent/vellum.html"), path)
            }
            other => panic!("wanted an open error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_rmdir_ignores_missing_directories() -> Result<()> {
        let dir = tempfile::tempdir()?;
        rmdir(&dir.path().join("post"))?;

        std::fs::create_dir_all(dir.path().join("post").join("nested"))?;
        rmdir(&dir.path().join("post"))?;
        assert!(!dir.path().join("post").exists());
        Ok(())
    }
}
