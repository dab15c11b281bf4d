//! Content previews. An editor's preview link carries a preview token (a
//! content ref) and the ID of the document being edited; resolving it yields
//! the site path to send the editor to. The same token is then passed to
//! [`crate::build::build_site`] to render the draft content.

use crate::client::{Client, Error, Result};
use crate::post::{post_path, POST_TYPE};
use tracing::debug;
use url::Url;

/// Maps a document to its path on the site. Posts with a UID get their own
/// page; everything else goes to the home page.
pub fn link_resolver(doc_type: &str, uid: Option<&str>) -> String {
    match (doc_type, uid) {
        (POST_TYPE, Some(uid)) => format!("/{}", post_path(uid)),
        _ => String::from("/"),
    }
}

/// Turns a site path from [`link_resolver`] into an absolute URL under
/// `site_root`, which must end in a slash.
pub fn redirect_url(site_root: &Url, path: &str) -> std::result::Result<Url, url::ParseError> {
    site_root.join(path.trim_start_matches('/'))
}

/// Resolves a preview token and document ID to the path the editor should be
/// redirected to. Returns `None` when the CMS rejects the token. A document
/// that can't be found at the token's ref resolves to the home page.
pub async fn resolve(client: &Client, token: &str, document_id: &str) -> Result<Option<String>> {
    let client = client.clone().with_ref(token);
    match client.get_by_id(document_id).await {
        Ok(Some(doc)) => Ok(Some(link_resolver(&doc.doc_type, doc.uid.as_deref()))),
        Ok(None) => Ok(Some(String::from("/"))),
        Err(Error::Status { status, .. }) if status.is_client_error() => {
            debug!(status = %status, "preview token rejected");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_link_resolver() {
        assert_eq!("/post/hello.html", link_resolver("post", Some("hello")));
        assert_eq!("/", link_resolver("post", None));
        assert_eq!("/", link_resolver("page", Some("about")));
    }

    #[test]
    fn test_redirect_url() -> std::result::Result<(), url::ParseError> {
        let site_root = Url::parse("https://example.com/blog/")?;
        assert_eq!(
            "https://example.com/blog/",
            redirect_url(&site_root, "/")?.as_str()
        );
        assert_eq!(
            "https://example.com/blog/post/x.html",
            redirect_url(&site_root, "/post/x.html")?.as_str()
        );
        assert_eq!(
            "https://example.com/blog/post/x.html",
            redirect_url(&site_root, &link_resolver(POST_TYPE, Some("x")))?.as_str()
        );
        Ok(())
    }
}
