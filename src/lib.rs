//! The library code for the `vellum` blog front-end. `vellum` reads posts from
//! a headless CMS and renders them into a static site. The architecture can be
//! broken down into three steps:
//!
//! 1. Querying the CMS ([`crate::client`]) for listing pages and full post
//!    documents ([`crate::post`])
//! 2. Converting the fetched content into display values ([`crate::format`],
//!    [`crate::richtext`])
//! 3. Rendering the index and post pages to disk ([`crate::write`])
//!
//! [`crate::build`] stitches these together. The post index is paginated: the
//! rendered index shows the first page, and [`crate::page::ListState`] follows
//! each page's cursor to load the rest ("load more"). The same controller is
//! used at build time to enumerate every post.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod client;
pub mod config;
pub mod format;
pub mod page;
pub mod post;
pub mod preview;
pub mod richtext;
pub mod value;
pub mod write;
