//! Endpoint method, path and servers.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;
use url::Url;

use super::grid::TableGrid;
use crate::config::BaseInfoKeys;
use crate::operation::{HttpMethod, Server};

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https?://[A-Za-z0-9_:#@%/;$()~?+=\\.&-]*").expect("static regex must compile")
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaseInfo {
    pub method: Option<HttpMethod>,
    pub path: Option<String>,
    pub servers: Vec<Server>,
}

impl BaseInfo {
    /// Reads a key/value table such as
    /// `| HTTP URL | https://open.douyin.com/oauth/token/ |`.
    ///
    /// Every row, the header included, is scanned; the cell after a key cell
    /// is its value. A URL value gives the path and a server. Without a URL,
    /// an ASCII value containing `/` is the path; otherwise `fallback_path`
    /// is used as is.
    ///
    /// # Examples
    ///
    /// ```
    /// use apidoc_schema_discovery::operation::HttpMethod;
    /// use apidoc_schema_discovery::parser::base_info::BaseInfo;
    /// use apidoc_schema_discovery::parser::grid::{GridCell, TableGrid};
    /// use apidoc_schema_discovery::BaseInfoKeys;
    ///
    /// let grid = TableGrid {
    ///     header: vec![GridCell::new("HTTP URL"), GridCell::new("https://open.douyin.com/oauth/access_token/")],
    ///     rows: vec![vec![GridCell::new("HTTP Method"), GridCell::new("post")]],
    /// };
    /// let info = BaseInfo::from_table(&grid, &BaseInfoKeys::default(), None);
    ///
    /// assert_eq!(info.method, Some(HttpMethod::Post));
    /// assert_eq!(info.path.as_deref(), Some("/oauth/access_token/"));
    /// assert_eq!(info.servers[0].url, "https://open.douyin.com");
    /// ```
    pub fn from_table(
        grid: &TableGrid,
        keys: &BaseInfoKeys,
        fallback_path: Option<&str>,
    ) -> Self {
        let mut info = Self::default();
        let mut url_value = None;

        for row in grid.all_rows() {
            let cells: Vec<&str> = row
                .iter()
                .map(|cell| cell.text.trim())
                .filter(|text| !text.is_empty())
                .collect();
            for pair in cells.windows(2) {
                let (key, value) = (pair[0], pair[1]);
                if keys.url.iter().any(|k| k == key) && url_value.is_none() {
                    url_value = Some(value.to_string());
                } else if keys.method.iter().any(|k| k == key) && info.method.is_none() {
                    info.method = value.parse().ok();
                }
            }
        }

        if let Some(value) = url_value {
            info.read_url_value(&value, fallback_path);
        }
        info
    }

    /// Reads a `METHOD url` line, e.g. `POST https://open.douyin.com/api/v2/` or
    /// `[GET /oauth/userinfo/]`. `previous_text` labels the server.
    ///
    /// Returns `None` when no bracketed token starts with a method name.
    pub fn from_text(text: &str, previous_text: Option<&str>) -> Option<Self> {
        text.split(['[', ']'])
            .map(str::trim)
            .find_map(|token| {
                let method = HttpMethod::prefix_of(token)?;
                let target = token.split_whitespace().nth(1)?;
                let mut info = Self {
                    method: Some(method),
                    ..Self::default()
                };
                match URL_RE.find(token).and_then(|m| Url::parse(m.as_str()).ok()) {
                    Some(url) => {
                        info.path = Some(url.path().to_string());
                        info.servers.push(Server {
                            url: server_url(&url),
                            description: previous_text
                                .map(str::trim)
                                .filter(|t| !t.is_empty())
                                .map(str::to_string),
                        });
                    }
                    None => info.path = Some(target.to_string()),
                }
                Some(info)
            })
    }

    fn read_url_value(&mut self, value: &str, fallback_path: Option<&str>) {
        let mut previous_end = 0;
        for found in URL_RE.find_iter(value) {
            let label = server_label(&value[previous_end..found.start()]);
            previous_end = found.end();
            let Ok(url) = Url::parse(found.as_str()) else {
                debug!(url = found.as_str(), "Skipping unparsable URL");
                continue;
            };
            if self.path.is_none() {
                self.path = Some(url.path().to_string());
            }
            self.servers.push(Server {
                url: server_url(&url),
                description: label,
            });
        }
        if self.path.is_some() {
            return;
        }

        let value = value.trim();
        if value.contains('/') && value.is_ascii() {
            self.path = Some(value.to_string());
        } else {
            self.path = fallback_path.map(str::to_string);
        }
    }
}

fn server_url(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}://{host}:{port}", url.scheme()),
        None => format!("{}://{host}", url.scheme()),
    }
}

/// Non-ASCII words before a URL, e.g. `线上环境` in `线上环境：https://…`.
fn server_label(text: &str) -> Option<String> {
    let label: String = text
        .chars()
        .filter(|c| !c.is_ascii() && c.is_alphanumeric())
        .collect();
    (!label.is_empty()).then_some(label)
}

/// `/` followed by the last `segments` non-empty segments of `path`.
pub(crate) fn trailing_path(path: &str, segments: usize) -> String {
    let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
    let start = parts.len().saturating_sub(segments);
    format!("/{}", parts[start..].join("/"))
}
