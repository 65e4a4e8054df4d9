//! Parser configuration.
//!
//! Holds the vocabulary the parser matches against: section headings, the
//! base-info table keys, description markers and a few name-driven rules.
//! Every key is optional in YAML; missing keys keep their built-in value.
//!
//! # Example YAML
//!
//! ```yaml
//! headings:
//!   request_headers: 请求头
//!   query_markers: [Query, URL 请求]
//! default_value_marker: 固定值
//! shared_schema_aliases: [extra]
//! schema_prefix_segments: 2
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use apidoc_schema_core::SchemaRegistry;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Heading texts that open each kind of section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadingVocabulary {
    /// Level-2 heading (exact) introducing the operation description.
    pub description: String,
    /// Headings (exact, any level) introducing method and URL.
    pub base_info: Vec<String>,
    /// Level-2 heading (exact) introducing request headers.
    pub request_headers: String,
    /// Level-2 heading (exact) introducing request parameters.
    pub request_parameters: String,
    /// Heading texts that, directly after the request parameter heading,
    /// mark the parameters as query parameters.
    pub query_markers: Vec<String>,
    /// Text contained in the level-2 heading introducing response fields.
    pub response_parameters: String,
    /// Texts contained in level-3 headings introducing a success example.
    pub response_example: Vec<String>,
    /// Texts contained in level-3 headings introducing an error example.
    pub error_example: Vec<String>,
}

impl Default for HeadingVocabulary {
    fn default() -> Self {
        Self {
            description: "接口说明".to_string(),
            base_info: strings(&["请求地址", "基本信息"]),
            request_headers: "请求头".to_string(),
            request_parameters: "请求参数".to_string(),
            query_markers: strings(&["Query", "URL 请求"]),
            response_parameters: "响应参数".to_string(),
            response_example: strings(&["响应样例", "正常"]),
            error_example: strings(&["异常", "失败", "错误"]),
        }
    }
}

/// Keys of the two-column base-info table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseInfoKeys {
    pub url: Vec<String>,
    pub method: Vec<String>,
}

impl Default for BaseInfoKeys {
    fn default() -> Self {
        Self {
            url: strings(&["HTTP URL", "接口URL"]),
            method: strings(&["HTTP Method", "通信协议"]),
        }
    }
}

/// Complete parser configuration.
///
/// # Examples
///
/// ```
/// use apidoc_schema_discovery::ParserConfig;
///
/// let config = ParserConfig::from_yaml_str("schema_prefix_segments: 3\n").unwrap();
/// assert_eq!(config.schema_prefix_segments, 3);
/// assert_eq!(config.headings.request_headers, "请求头");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub headings: HeadingVocabulary,
    pub base_info_keys: BaseInfoKeys,
    /// Marker in a description that precedes a fixed (default) value.
    pub default_value_marker: String,
    /// Marker in a description that precedes an example value.
    pub example_marker: String,
    /// Field names treated as a content-type header.
    pub content_type_names: Vec<String>,
    /// Field names whose type is `string` when the document gives none.
    pub always_string_names: Vec<String>,
    /// Property names promoted under their own name, shared by every
    /// endpoint.
    pub shared_schema_aliases: Vec<String>,
    /// Trailing path segments used to build the schema prefix.
    pub schema_prefix_segments: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            headings: HeadingVocabulary::default(),
            base_info_keys: BaseInfoKeys::default(),
            default_value_marker: "固定值".to_string(),
            example_marker: "示例".to_string(),
            content_type_names: strings(&["content-type"]),
            always_string_names: strings(&["content-type", "access-token"]),
            shared_schema_aliases: strings(&["extra"]),
            schema_prefix_segments: 2,
        }
    }
}

impl ParserConfig {
    /// Parses a YAML document. Missing keys take their default values.
    ///
    /// # Errors
    ///
    /// Returns [`Yaml`](crate::DiscoveryError::Yaml) if the text is not a
    /// valid configuration.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::DiscoveryError::Io) if the file cannot be read,
    /// or [`Yaml`](crate::DiscoveryError::Yaml) if parsing fails.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let config = serde_yaml::from_reader(BufReader::new(file))?;
        Ok(config)
    }

    /// Writes the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_yaml::to_writer(BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Fresh schema registry using this configuration's shared aliases.
    pub fn schema_registry(&self) -> SchemaRegistry {
        SchemaRegistry::with_shared_aliases(self.shared_schema_aliases.iter().cloned())
    }

    pub fn is_content_type_name(&self, name: &str) -> bool {
        self.content_type_names
            .iter()
            .any(|n| n.eq_ignore_ascii_case(name))
    }

    pub fn is_always_string_name(&self, name: &str) -> bool {
        self.always_string_names
            .iter()
            .any(|n| n.eq_ignore_ascii_case(name))
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
