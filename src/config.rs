//! Loads the project configuration from `vellum.yaml` and the theme from
//! `theme/theme.yaml`.

use serde::Deserialize;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use url::Url;

/// The name of the project file.
pub const PROJECT_FILE: &str = "vellum.yaml";

/// When set, this environment variable overrides the project file's
/// `access_token`.
pub const ACCESS_TOKEN_ENV: &str = "CMS_ACCESS_TOKEN";

#[derive(Deserialize)]
struct PageSize(usize);
impl Default for PageSize {
    fn default() -> Self {
        PageSize(10)
    }
}

#[derive(Deserialize)]
struct Project {
    pub api_endpoint: Url,

    #[serde(default)]
    pub access_token: Option<String>,

    pub site_root: Url,

    #[serde(default)]
    pub index_page_size: PageSize,

    #[serde(default)]
    pub comments: Option<Comments>,
}

#[derive(Deserialize)]
struct Theme {
    index_template: Vec<PathBuf>,
    post_template: Vec<PathBuf>,
}

/// Settings for the comment widget embedded in post pages. They are passed to
/// the post template as-is.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Comments {
    /// The repository that stores the comment threads, e.g. `owner/blog`.
    pub repo: String,

    /// How a page is mapped to its thread.
    #[serde(default = "default_issue_term")]
    pub issue_term: String,

    #[serde(default = "default_comments_theme")]
    pub theme: String,
}

fn default_issue_term() -> String {
    String::from("pathname")
}

fn default_comments_theme() -> String {
    String::from("github-dark")
}

#[derive(Clone, Debug)]
pub struct Config {
    pub api_endpoint: Url,
    pub access_token: Option<String>,
    pub site_root: Url,
    pub index_page_size: usize,
    pub index_template: Vec<PathBuf>,
    pub post_template: Vec<PathBuf>,
    pub output_directory: PathBuf,
    pub comments: Option<Comments>,
}

impl Config {
    /// Searches `dir` and then each of its ancestors for [`PROJECT_FILE`] and
    /// loads the first one found.
    pub fn from_directory(dir: &Path, output_directory: &Path) -> Result<Config> {
        let path = dir.join(PROJECT_FILE);
        if path.exists() {
            Config::from_project_file(&path, output_directory)
        } else {
            match dir.parent() {
                Some(parent) => Config::from_directory(parent, output_directory),
                None => Err(Error::NotFound),
            }
        }
    }

    pub fn from_project_file(path: &Path, output_directory: &Path) -> Result<Config> {
        let project: Project = serde_yaml::from_reader(open(path)?)
            .map_err(|err| Error::Yaml(path.to_owned(), err))?;
        let project_root = path
            .parent()
            .ok_or_else(|| Error::NoParent(path.to_owned()))?;

        let theme_dir = project_root.join("theme");
        let theme_path = theme_dir.join("theme.yaml");
        let theme: Theme = serde_yaml::from_reader(open(&theme_path)?)
            .map_err(|err| Error::Yaml(theme_path.clone(), err))?;

        let access_token =
            access_token(std::env::var(ACCESS_TOKEN_ENV).ok(), project.access_token);

        Ok(Config {
            api_endpoint: project.api_endpoint,
            access_token,
            site_root: with_trailing_slash(project.site_root),
            index_page_size: project.index_page_size.0.max(1),
            index_template: theme
                .index_template
                .iter()
                .map(|relpath| theme_dir.join(relpath))
                .collect(),
            post_template: theme
                .post_template
                .iter()
                .map(|relpath| theme_dir.join(relpath))
                .collect(),
            output_directory: output_directory.to_owned(),
            comments: project.comments,
        })
    }
}

// A non-empty [`ACCESS_TOKEN_ENV`] value wins over the project file's token.
fn access_token(env: Option<String>, file: Option<String>) -> Option<String> {
    env.filter(|token| !token.is_empty()).or(file)
}

// Without a trailing slash, [`Url::join`] treats the last path segment as a
// file name and replaces it.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|err| Error::Open(path.to_owned(), err))
}

/// The result of loading the configuration.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading the configuration.
#[derive(Debug)]
pub enum Error {
    /// Returned when no [`PROJECT_FILE`] exists in the directory or any of
    /// its ancestors.
    NotFound,

    /// Returned when the project file path has no parent directory.
    NoParent(PathBuf),

    /// Returned when a configuration file can't be opened.
    Open(PathBuf, std::io::Error),

    /// Returned when a configuration file isn't valid YAML for its schema.
    Yaml(PathBuf, serde_yaml::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::NotFound => write!(
                f,
                "Could not find `{}` in any parent directory",
                PROJECT_FILE
            ),
            Error::NoParent(path) => write!(
                f,
                "Can't get parent directory for project file '{}'",
                path.display()
            ),
            Error::Open(path, err) => {
                write!(f, "Opening '{}': {}", path.display(), err)
            }
            Error::Yaml(path, err) => {
                write!(f, "Loading '{}': {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::NotFound => None,
            Error::NoParent(_) => None,
            Error::Open(_, err) => Some(err),
            Error::Yaml(_, err) => Some(err),
        }
    }
}
