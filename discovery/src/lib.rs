//! Field tree and schema extraction from API documentation pages.
//!
//! This crate reads human-written HTML or Markdown API documentation, the
//! kind where request and response fields live in loosely formatted tables,
//! and rebuilds the field hierarchy those tables describe. The result is an
//! [`ApiDocument`] whose fields can be rendered into OpenAPI parameters,
//! request bodies and a deduplicated `components.schemas` registry.
//!
//! # Main entry points
//!
//! - [`parse_document`]: parse one page with the built-in heading vocabulary.
//! - [`parse_document_with_config`]: same, with a custom [`ParserConfig`] and
//!   the page's location on its documentation site.
//! - [`parse_documents`]: parse many independent pages on a bounded worker
//!   pool.
//!
//! # Example
//!
//! ```
//! use apidoc_schema_core::SchemaRegistry;
//! use apidoc_schema_discovery::{HttpMethod, parse_document};
//!
//! let page = "\
//! ## 请求地址
//!
//! POST https://open.douyin.com/oauth/client_token/
//!
//! ## 响应参数
//!
//! | 名称 | 类型 | 描述 |
//! | --- | --- | --- |
//! | data | object | |
//! | .access_token | string | 调用凭证 |
//! | .expires_in | int64 | 过期时间，单位秒 |
//! ";
//!
//! let doc = parse_document(page).unwrap();
//! assert_eq!(doc.method, Some(HttpMethod::Post));
//! assert_eq!(doc.path.as_deref(), Some("/oauth/client_token/"));
//!
//! let mut registry = SchemaRegistry::new();
//! doc.response_schema(&mut registry);
//! assert!(registry.contains("OauthClientTokenResponse"));
//! assert!(registry.contains("OauthClientTokenData"));
//! ```

pub mod config;
pub mod error;
pub mod operation;
pub mod parser;
pub mod report;

use rayon::prelude::*;
use tracing::debug;

pub use config::{BaseInfoKeys, HeadingVocabulary, ParserConfig};
pub use error::{DiscoveryError, Result};
pub use operation::{
    ApiDocument, HttpMethod, Parameter, ParameterLocation, RequestBody, Server,
};
pub use parser::DocParser;
pub use report::ParseDiagnostics;

/// Parses one documentation page with the default configuration.
///
/// # Errors
///
/// See [`DocParser::parse`].
pub fn parse_document(input: &str) -> Result<ApiDocument> {
    parse_document_with_config(input, None, &ParserConfig::default())
}

/// Parses one documentation page.
///
/// `doc_path` is the page's location on its documentation site; it supplies
/// the endpoint path when the page gives none.
///
/// # Examples
///
/// ```
/// use apidoc_schema_discovery::{ParserConfig, parse_document_with_config};
///
/// let doc = parse_document_with_config(
///     "## 请求参数\n\n| 参数名 | 类型 |\n| --- | --- |\n| code | string |\n",
///     Some("/docs/openapi/account/get-token"),
///     &ParserConfig::default(),
/// )
/// .unwrap();
/// assert_eq!(doc.path.as_deref(), Some("/account/get-token"));
/// assert_eq!(doc.body_fields.len(), 1);
/// ```
pub fn parse_document_with_config(
    input: &str,
    doc_path: Option<&str>,
    config: &ParserConfig,
) -> Result<ApiDocument> {
    let mut parser = DocParser::new(input, config);
    if let Some(doc_path) = doc_path {
        parser = parser.with_doc_path(doc_path);
    }
    let document = parser.parse()?;
    for warning in document.diagnostics.warnings() {
        debug!(path = ?document.path, warning = %warning, "Parse warning");
    }
    Ok(document)
}

/// One page for [`parse_documents`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSource {
    pub doc_path: Option<String>,
    pub content: String,
}

impl DocumentSource {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            doc_path: None,
            content: content.into(),
        }
    }

    pub fn with_doc_path(mut self, doc_path: impl Into<String>) -> Self {
        self.doc_path = Some(doc_path.into());
        self
    }
}

/// Parses independent pages in parallel and returns one result per page, in
/// input order.
///
/// `jobs` bounds the worker pool; `None` or `Some(0)` picks a default from
/// the available parallelism.
///
/// # Errors
///
/// The outer result fails only when the worker pool cannot be built. Each
/// page's own parse error is reported in its slot.
///
/// # Examples
///
/// ```
/// use apidoc_schema_discovery::{DocumentSource, ParserConfig, parse_documents};
///
/// let sources = vec![
///     DocumentSource::new("## 请求地址\n\nGET /oauth/userinfo/\n"),
///     DocumentSource::new("## 请求地址\n\nPOST /oauth/refresh_token/\n"),
/// ];
/// let results = parse_documents(&sources, &ParserConfig::default(), Some(2)).unwrap();
///
/// let paths: Vec<_> = results
///     .iter()
///     .map(|r| r.as_ref().unwrap().path.clone().unwrap())
///     .collect();
/// assert_eq!(paths, vec!["/oauth/userinfo/", "/oauth/refresh_token/"]);
/// ```
pub fn parse_documents(
    sources: &[DocumentSource],
    config: &ParserConfig,
    jobs: Option<usize>,
) -> Result<Vec<Result<ApiDocument>>> {
    let jobs = jobs
        .filter(|jobs| *jobs > 0)
        .unwrap_or_else(|| default_parallel_jobs(sources.len()));
    let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;
    debug!(documents = sources.len(), jobs, "Parsing documents");

    Ok(pool.install(|| {
        sources
            .par_iter()
            .map(|source| {
                parse_document_with_config(&source.content, source.doc_path.as_deref(), config)
            })
            .collect()
    }))
}

fn default_parallel_jobs(document_count: usize) -> usize {
    let cpu_count = std::thread::available_parallelism()
        .map(|parallelism| parallelism.get())
        .unwrap_or(4);
    cpu_count.min(16).max(1).min(document_count.max(1))
}
