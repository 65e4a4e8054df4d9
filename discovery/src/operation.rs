//! Parsed documentation page and its OpenAPI operation pieces.

use std::fmt;
use std::str::FromStr;

use apidoc_schema_core::{
    FieldId, FieldTree, Schema, SchemaRegistry, SchemaSynthesizer, schema_prefix, upper_camel,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::error::DiscoveryError;
use crate::report::ParseDiagnostics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    Trace,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 8] = [
        Self::Get,
        Self::Post,
        Self::Put,
        Self::Delete,
        Self::Patch,
        Self::Head,
        Self::Options,
        Self::Trace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Trace => "TRACE",
        }
    }

    /// Method whose upper-case name `text` starts with.
    pub fn prefix_of(text: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|method| text.starts_with(method.as_str()))
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = DiscoveryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| DiscoveryError::UnknownMethod(trimmed.to_string()))
    }
}

/// Server base URL (`scheme://host[:port]`) with an optional label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Query,
    Header,
}

/// OpenAPI parameter object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    pub required: bool,
    pub schema: Schema,
}

/// OpenAPI request body with a single media type.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestBody {
    pub media_type: &'static str,
    pub required: bool,
    pub schema: Schema,
}

impl RequestBody {
    pub fn to_json_value(&self) -> Value {
        let mut content = Map::new();
        content.insert(self.media_type.to_string(), json!({ "schema": self.schema }));
        json!({ "required": self.required, "content": content })
    }
}

/// Everything read from one documentation page.
///
/// Field lists are roots in [`tree`](Self::tree); schemas are synthesized on
/// demand, so the same document can be rendered into several registries.
#[derive(Debug, Clone, Default)]
pub struct ApiDocument {
    pub method: Option<HttpMethod>,
    pub path: Option<String>,
    pub servers: Vec<Server>,
    pub description: Option<String>,
    pub success_example: Option<String>,
    pub error_example: Option<String>,
    pub header_fields: Vec<FieldId>,
    pub query_fields: Vec<FieldId>,
    pub body_fields: Vec<FieldId>,
    pub response_fields: Vec<FieldId>,
    pub tree: FieldTree,
    pub diagnostics: ParseDiagnostics,
    /// Trailing path segments used by [`schema_prefix`](Self::schema_prefix).
    pub prefix_segments: usize,
}

impl ApiDocument {
    /// Registry name prefix derived from the path, e.g. `OauthAccessToken`
    /// for `/oauth/access_token/`.
    pub fn schema_prefix(&self) -> String {
        schema_prefix(self.path.as_deref().unwrap_or(""), self.prefix_segments)
    }

    /// `operationId` for the page: the lower-case method name joined with the
    /// last path segment, in lower camel case. Words of the segment that are
    /// themselves method names are dropped, so `GET /user/get_info` gives
    /// `getInfo`. Without a method the segment alone is used.
    ///
    /// # Examples
    ///
    /// ```
    /// use apidoc_schema_discovery::{ApiDocument, HttpMethod};
    ///
    /// let doc = ApiDocument {
    ///     method: Some(HttpMethod::Post),
    ///     path: Some("/oauth/client_token/".into()),
    ///     ..ApiDocument::default()
    /// };
    /// assert_eq!(doc.operation_id().as_deref(), Some("postClientToken"));
    /// ```
    pub fn operation_id(&self) -> Option<String> {
        let segment = self
            .path
            .as_deref()?
            .split('/')
            .rfind(|segment| !segment.is_empty())?
            .replace('-', "_");
        let words: Vec<&str> = segment
            .split('_')
            .filter(|word| {
                !HttpMethod::ALL
                    .iter()
                    .any(|method| method.as_str().eq_ignore_ascii_case(word))
            })
            .collect();

        let joined = match self.method {
            Some(method) => format!("{}_{}", method.as_str().to_ascii_lowercase(), words.join("_")),
            None => words.join("_"),
        };
        Some(lower_camel(&joined)).filter(|id| !id.is_empty())
    }

    /// Tag grouping the operation: the path segment in front of the last
    /// one, e.g. `oauth` for `/oauth/userinfo/`.
    pub fn tag(&self) -> Option<String> {
        let segments: Vec<&str> = self
            .path
            .as_deref()?
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect();
        let index = segments.len().checked_sub(2)?;
        Some(segments[index].to_string())
    }

    /// Query parameters followed by header parameters.
    pub fn parameters(&self) -> Vec<Parameter> {
        let mut synth = SchemaSynthesizer::new(&self.tree);
        let query = self
            .query_fields
            .iter()
            .map(|id| (*id, ParameterLocation::Query));
        let header = self
            .header_fields
            .iter()
            .map(|id| (*id, ParameterLocation::Header));

        query
            .chain(header)
            .map(|(id, location)| {
                let field = self.tree.get(id);
                Parameter {
                    name: field.name.clone(),
                    location,
                    description: Some(field.description.clone()).filter(|d| !d.is_empty()),
                    example: field.example.clone(),
                    required: field.required,
                    schema: synth.schema_of(id),
                }
            })
            .collect()
    }

    /// Request body from the body fields, kept inline.
    ///
    /// The media type is `multipart/form-data` when any body field is a
    /// binary upload and `application/json` otherwise.
    pub fn request_body(&self) -> RequestBody {
        let media_type = if self
            .body_fields
            .iter()
            .any(|id| self.tree.get(*id).is_binary_type())
        {
            "multipart/form-data"
        } else {
            "application/json"
        };

        let mut synth = SchemaSynthesizer::new(&self.tree);
        RequestBody {
            media_type,
            required: !self.body_fields.is_empty(),
            schema: root_object(&mut synth, &self.tree, &self.body_fields),
        }
    }

    /// Registers the response schema as `<Prefix>Response`, promoting nested
    /// objects and every alternate child set, and returns a reference to it.
    ///
    /// The root goes through [`SchemaRegistry::register`], so a different
    /// schema already holding that key (a nested `response` property, say)
    /// is kept and the root takes a numbered key instead.
    ///
    /// # Examples
    ///
    /// ```
    /// use apidoc_schema_core::SchemaRegistry;
    /// use apidoc_schema_discovery::parse_document;
    ///
    /// let doc = parse_document(
    ///     "## 基本信息\n\n| 名称 | 描述 |\n| --- | --- |\n| HTTP URL | https://open.douyin.com/oauth/userinfo/ |\n\n\
    ///      ## 响应参数\n\n| 名称 | 类型 |\n| --- | --- |\n| data | object |\n| .open_id | string |\n| .nickname | string |\n",
    /// ).unwrap();
    ///
    /// let mut registry = SchemaRegistry::new();
    /// let reference = doc.response_schema(&mut registry);
    /// assert_eq!(reference.reference_name(), Some("OauthUserinfoResponse"));
    /// assert!(registry.contains("OauthUserinfoData"));
    /// ```
    pub fn response_schema(&self, registry: &mut SchemaRegistry) -> Schema {
        let prefix = self.schema_prefix();
        let mut synth = SchemaSynthesizer::new(&self.tree);

        let mut root = root_object(&mut synth, &self.tree, &self.response_fields);
        registry.promote_properties(&prefix, &mut root);

        for id in self
            .response_fields
            .iter()
            .flat_map(|root| self.tree.descendants(*root))
        {
            for (alternate, mut schema) in synth.alternate_schemas(id) {
                registry.promote_properties(&prefix, &mut schema);
                let registered = registry.register(&prefix, &alternate, schema);
                debug!(schema = %registered, "Registered alternate definition");
            }
        }

        let key = registry.register(&prefix, "Response", root);
        debug!(schema = %key, "Registered response schema");
        Schema::reference(key)
    }

    /// OpenAPI operation object with promoted schemas written to
    /// `registry`.
    pub fn to_operation(&self, registry: &mut SchemaRegistry) -> Value {
        let mut operation = Map::new();
        if let Some(operation_id) = self.operation_id() {
            operation.insert("operationId".into(), json!(operation_id));
        }
        if let Some(tag) = self.tag() {
            operation.insert("tags".into(), json!([tag]));
        }
        if let Some(description) = &self.description {
            operation.insert("description".into(), json!(description));
        }

        let parameters = self.parameters();
        if !parameters.is_empty() {
            operation.insert("parameters".into(), json!(parameters));
        }

        if !self.body_fields.is_empty() {
            operation.insert("requestBody".into(), self.request_body().to_json_value());
        }

        let mut media = Map::new();
        media.insert("schema".into(), json!(self.response_schema(registry)));
        if let Some(example) = self.success_example.as_deref().and_then(parse_example) {
            media.insert("example".into(), example);
        }
        operation.insert(
            "responses".into(),
            json!({
                "200": {
                    "description": "OK",
                    "content": { "application/json": media },
                }
            }),
        );

        if !self.servers.is_empty() {
            operation.insert("servers".into(), json!(self.servers));
        }
        Value::Object(operation)
    }
}

/// Object schema with one property per root, no single-child collapse.
fn root_object(synth: &mut SchemaSynthesizer<'_>, tree: &FieldTree, roots: &[FieldId]) -> Schema {
    let properties: IndexMap<String, Schema> = roots
        .iter()
        .map(|id| (tree.get(*id).name.clone(), synth.schema_of(*id)))
        .collect();
    Schema::object(properties)
}

fn lower_camel(text: &str) -> String {
    let upper = upper_camel(text);
    let mut chars = upper.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn parse_example(text: &str) -> Option<Value> {
    serde_json::from_str(text.trim()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use apidoc_schema_core::Field;

    fn document(path: &str) -> ApiDocument {
        ApiDocument {
            path: Some(path.to_string()),
            prefix_segments: 2,
            ..ApiDocument::default()
        }
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("post".parse::<HttpMethod>().unwrap(), HttpMethod::Post);
        assert_eq!(" GET ".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert!(matches!(
            "FETCH".parse::<HttpMethod>(),
            Err(DiscoveryError::UnknownMethod(m)) if m == "FETCH"
        ));
        assert_eq!(HttpMethod::prefix_of("POST /oauth/token"), Some(HttpMethod::Post));
        assert_eq!(serde_json::to_value(HttpMethod::Delete).unwrap(), "delete");
    }

    #[test]
    fn test_parameters_query_then_header() {
        let mut doc = document("/oauth/userinfo/");
        let token = doc.tree.push(Field::new("access-token").with_type("string"));
        let mut open_id = Field::new("open_id").with_type("string");
        open_id.required = true;
        open_id.description = "用户标识".into();
        let open_id = doc.tree.push(open_id);
        doc.header_fields = vec![token];
        doc.query_fields = vec![open_id];

        let parameters = doc.parameters();
        assert_eq!(parameters[0].name, "open_id");
        assert_eq!(parameters[0].location, ParameterLocation::Query);
        assert_eq!(parameters[1].name, "access-token");

        let json = serde_json::to_value(&parameters[0]).unwrap();
        assert_eq!(json["in"], "query");
        assert_eq!(json["required"], true);
        assert_eq!(json["description"], "用户标识");
        assert_eq!(json["schema"]["type"], "string");
    }

    #[test]
    fn test_request_body_media_type() {
        let mut doc = document("/api/upload");
        assert!(!doc.request_body().required);

        let file = doc.tree.push(Field::new("file").with_type("binary"));
        let name = doc.tree.push(Field::new("name").with_type("string"));
        doc.body_fields = vec![file, name];

        let body = doc.request_body();
        assert_eq!(body.media_type, "multipart/form-data");
        assert!(body.required);
        let json = body.to_json_value();
        let properties = &json["content"]["multipart/form-data"]["schema"]["properties"];
        assert_eq!(properties["file"]["format"], "binary");
        assert_eq!(properties["name"]["type"], "string");
    }

    #[test]
    fn test_response_schema_promotes_and_keeps_primitives_inline() {
        let mut doc = document("/oauth/access_token/");
        let data = doc.tree.push(Field::new("data").with_type("object"));
        let token = doc.tree.push(Field::new("access_token").with_type("string"));
        let expires = doc.tree.push(Field::new("expires_in").with_type("int64"));
        doc.tree.attach_child(data, token);
        doc.tree.attach_child(data, expires);
        let tags = doc.tree.push(Field::new("tags").with_type("[]string"));
        doc.response_fields = vec![data, tags];

        let mut registry = SchemaRegistry::new();
        let reference = doc.response_schema(&mut registry);
        assert_eq!(reference.reference_name(), Some("OauthAccessTokenResponse"));

        let response = serde_json::to_value(registry.get("OauthAccessTokenResponse").unwrap()).unwrap();
        assert_eq!(
            response["properties"]["data"]["$ref"],
            "#/components/schemas/OauthAccessTokenData"
        );
        assert_eq!(response["properties"]["tags"]["items"]["type"], "string");
        assert!(!registry.contains("OauthAccessTokenTags"));
        assert!(registry.validate().is_empty());
    }

    #[test]
    fn test_response_root_does_not_replace_nested_response() {
        let mut doc = document("/oauth/renew_refresh_token/");
        let response = doc.tree.push(Field::new("response").with_type("object"));
        let token = doc.tree.push(Field::new("refresh_token").with_type("string"));
        let expires = doc.tree.push(Field::new("expires_in").with_type("int64"));
        doc.tree.attach_child(response, token);
        doc.tree.attach_child(response, expires);
        doc.response_fields = vec![response];

        let mut registry = SchemaRegistry::new();
        let reference = doc.response_schema(&mut registry);
        assert_eq!(
            reference.reference_name(),
            Some("OauthRenewRefreshTokenResponse2")
        );

        let nested = registry.get("OauthRenewRefreshTokenResponse").unwrap();
        assert!(nested.properties().unwrap().contains_key("refresh_token"));
        let root = serde_json::to_value(registry.get("OauthRenewRefreshTokenResponse2").unwrap())
            .unwrap();
        assert_eq!(
            root["properties"]["response"]["$ref"],
            "#/components/schemas/OauthRenewRefreshTokenResponse"
        );

        // Rendering the same page again reuses both entries.
        let again = doc.response_schema(&mut registry);
        assert_eq!(again, reference);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_operation_id_and_tag() {
        let mut doc = document("/oauth/client_token/");
        doc.method = Some(HttpMethod::Post);
        assert_eq!(doc.operation_id().as_deref(), Some("postClientToken"));
        assert_eq!(doc.tag().as_deref(), Some("oauth"));

        let mut doc = document("/api/apps/v2/get-user-info");
        doc.method = Some(HttpMethod::Get);
        assert_eq!(doc.operation_id().as_deref(), Some("getUserInfo"));
        assert_eq!(doc.tag().as_deref(), Some("v2"));

        let doc = document("/jscode2session");
        assert_eq!(doc.operation_id().as_deref(), Some("jscode2session"));
        assert_eq!(doc.tag(), None);

        assert_eq!(ApiDocument::default().operation_id(), None);
    }

    #[test]
    fn test_alternate_sets_are_registered() {
        let mut doc = document("/api/douyin/video");
        let extra = doc.tree.push(Field::new("extra").with_type("object"));
        let logid = doc.tree.push(Field::new("logid").with_type("string"));
        doc.tree.attach_child(extra, logid);
        let now = doc.tree.push(Field::new("now").with_type("int64"));
        let logid2 = doc.tree.push(Field::new("logid").with_type("string"));
        let key = doc.tree.add_alternate_child_set(extra, vec![now, logid2]);
        assert_eq!(key, "extra1");
        let data = doc.tree.push(Field::new("data").with_type("object"));
        let id = doc.tree.push(Field::new("id").with_type("int64"));
        let title = doc.tree.push(Field::new("title").with_type("string"));
        doc.tree.attach_child(data, id);
        doc.tree.attach_child(data, title);
        doc.response_fields = vec![data, extra];

        let mut registry = SchemaRegistry::new();
        doc.response_schema(&mut registry);

        let alternate = registry.get("DouyinVideoExtra1").unwrap();
        let properties = alternate.properties().unwrap();
        assert!(properties.contains_key("now"));
        assert!(properties.contains_key("logid"));
    }

    #[test]
    fn test_operation_object() {
        let mut doc = document("/oauth/userinfo/");
        doc.method = Some(HttpMethod::Get);
        doc.description = Some("获取用户信息".into());
        doc.success_example = Some("{\"data\": {\"open_id\": \"x\"}}".into());
        let data = doc.tree.push(Field::new("data").with_type("object"));
        let open_id = doc.tree.push(Field::new("open_id").with_type("string"));
        doc.tree.attach_child(data, open_id);
        doc.response_fields = vec![data];

        let mut registry = SchemaRegistry::new();
        let operation = doc.to_operation(&mut registry);
        let media = &operation["responses"]["200"]["content"]["application/json"];
        assert_eq!(media["schema"]["$ref"], "#/components/schemas/OauthUserinfoResponse");
        assert_eq!(media["example"]["data"]["open_id"], "x");
        assert_eq!(operation["description"], "获取用户信息");
        assert_eq!(operation["operationId"], "getUserinfo");
        assert_eq!(operation["tags"], json!(["oauth"]));
        assert!(operation.get("requestBody").is_none());
    }
}
