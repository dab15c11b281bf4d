//! Conversions from content types into template [`Value`]s.

use crate::config::Comments;
use crate::post::PostLink;
use gtmpl::Value;
use std::collections::HashMap;
use url::Url;

impl From<&PostLink> for Value {
    /// Converts a [`PostLink`] into `{uid, title}`. The page URL is added by
    /// the writer, which knows the site root.
    fn from(link: &PostLink) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("uid".to_owned(), (&link.uid).into());
        m.insert("title".to_owned(), (&link.title).into());
        Value::Object(m)
    }
}

impl From<&Comments> for Value {
    /// Converts the comment widget settings into `{repo, issue_term, theme}`.
    fn from(comments: &Comments) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("repo".to_owned(), (&comments.repo).into());
        m.insert("issue_term".to_owned(), (&comments.issue_term).into());
        m.insert("theme".to_owned(), (&comments.theme).into());
        Value::Object(m)
    }
}

/// Converts a [`Url`] into a string [`Value`].
pub fn url(url: &Url) -> Value {
    Value::String(url.to_string())
}

/// Converts `None` into [`Value::Nil`] so templates can test the field with
/// `{{if}}`.
pub fn option<T>(opt: Option<T>) -> Value
where
    T: Into<Value>,
{
    match opt {
        Some(v) => v.into(),
        None => Value::Nil,
    }
}

/// Inserts `value` under `key` into `object` if it is a [`Value::Object`].
pub fn insert(object: &mut Value, key: &str, value: Value) {
    if let Value::Object(m) = object {
        m.insert(key.to_owned(), value);
    }
}
