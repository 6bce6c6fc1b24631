//! API contract loader: turns an OpenAPI (3.x) or Swagger (2.0) document into a
//! normalized `ApiContract`, optionally merged with a models list.
//!
//! Path templates are normalized so placeholders compare equal whatever they
//! are called: `/models/{model_id}` and `/models/{id}` are both `/models/{}`.
//! Documented URLs that substitute a concrete value (`/models/gpt-4`) match a
//! placeholder segment, as long as the segment keeps any literal text around
//! the placeholder (`/files/{id}.json` matches `/files/abc.json`).

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_yaml::Value;

use crate::error::ContractLoadError;

/// Path prefix assumed to mark API URLs when the contract names none.
pub const DEFAULT_API_PREFIX: &str = "/v1";

/// Operation keys of an OpenAPI path item.
const HTTP_METHODS: [&str; 8] = ["delete", "get", "head", "options", "patch", "post", "put", "trace"];

/// Maximum `$ref` / composition depth followed while flattening schemas.
const MAX_SCHEMA_DEPTH: u8 = 16;

/// Normalized view of the API specification.
#[derive(Debug, Clone)]
pub struct ApiContract {
    /// Path prefixes from `servers[].url` or `basePath`, e.g. `/v1`.
    pub base_paths: Vec<String>,
    /// Endpoints keyed by method and normalized path.
    pub endpoints: BTreeMap<EndpointKey, Endpoint>,
    /// Where the contract was loaded from.
    pub file: PathBuf,
    /// Served models, when a models list was supplied.
    pub models: Option<BTreeMap<String, ModelInfo>>,
}

/// One operation of the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Upper-cased HTTP method.
    pub method: String,
    /// Declared parameters: path, query, header, cookie and request-body fields.
    pub parameters: Vec<Parameter>,
    /// Success response description.
    pub response: ResponseShape,
    /// Path template as written in the contract.
    pub template: PathTemplate,
}

impl Endpoint {
    /// Whether the endpoint declares a parameter with exactly this name.
    pub fn has_parameter(&self, name: &str) -> bool {
        return self.parameters.iter().any(|p| return p.name == name);
    }
}

/// (method, normalized path) identity of an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EndpointKey {
    /// Upper-cased HTTP method.
    pub method: String,
    /// Path with every placeholder rewritten to `{}`.
    pub path: String,
}

impl fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "{} {}", self.method, self.path);
    }
}

/// Model metadata from the platform's models list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelInfo {
    /// Capability names the model advertises.
    pub capabilities: Vec<String>,
    /// Maximum context length in tokens, when advertised.
    pub context_length: Option<u64>,
}

/// A models-list response: `{"data": [...]}` or a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
enum ModelsBody {
    /// Bare array of models.
    Bare(Vec<RawModel>),
    /// OpenAI-style envelope.
    Wrapped {
        /// The models.
        data: Vec<RawModel>,
    },
}

/// Where a parameter travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ParamLocation {
    /// Request body field.
    Body,
    /// Cookie.
    Cookie,
    /// Request header.
    Header,
    /// Path placeholder.
    Path,
    /// Query string.
    Query,
}

impl ParamLocation {
    /// Parse an OpenAPI `in` value. `formData` counts as body.
    fn from_in(value: &str) -> Option<Self> {
        return match value {
            "body" | "formData" => Some(Self::Body),
            "cookie" => Some(Self::Cookie),
            "header" => Some(Self::Header),
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            _ => None,
        };
    }
}

/// A declared parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Where the parameter is sent.
    pub location: ParamLocation,
    /// Exact declared name.
    pub name: String,
    /// Whether the contract marks it required.
    pub required: bool,
    /// Schema type, or `any` when undeclared.
    pub schema_type: String,
}

/// A parsed path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    /// Template as written.
    pub raw: String,
    /// Segments between `/` separators.
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Number of literal segments; more literals is a more specific match.
    fn literal_count(&self) -> usize {
        return self.segments.iter().filter(|s| return matches!(s, Segment::Literal(_))).count();
    }

    /// Whether a documented path (concrete values or placeholders) fits this template.
    pub fn matches(&self, documented: &Self) -> bool {
        if self.segments.len() != documented.segments.len() {
            return false;
        }
        return self
            .segments
            .iter()
            .zip(&documented.segments)
            .all(|(ours, theirs)| return ours.accepts(theirs));
    }

    /// Canonical form with placeholders rewritten to `{}`.
    pub fn normalized(&self) -> String {
        if self.segments.is_empty() {
            return "/".to_string();
        }
        let mut out = String::new();
        for segment in &self.segments {
            out.push('/');
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Param { prefix, suffix } => {
                    out.push_str(prefix);
                    out.push_str("{}");
                    out.push_str(suffix);
                },
            }
        }
        return out;
    }

    /// Parse a path. Query strings and fragments are dropped, empty segments
    /// collapse, and `{x}`, `${x}`, `<x>` and `:x` are placeholders.
    pub fn parse(raw: &str) -> Self {
        let path = raw.split(['?', '#']).next().unwrap_or("");
        let segments = path
            .split('/')
            .filter(|s| return !s.is_empty())
            .map(Segment::parse)
            .collect();
        return Self { raw: raw.to_string(), segments };
    }

    /// Drop a leading prefix (e.g. a server base path). `None` if the path
    /// does not start with it.
    pub fn strip_prefix(&self, prefix: &str) -> Option<Self> {
        let prefix = Self::parse(prefix);
        if prefix.segments.is_empty() || prefix.segments.len() > self.segments.len() {
            return None;
        }
        let (head, tail) = self.segments.split_at(prefix.segments.len());
        if head != prefix.segments.as_slice() {
            return None;
        }
        return Some(Self { raw: self.raw.clone(), segments: tail.to_vec() });
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(&self.raw);
    }
}

/// One model entry in a models-list response.
#[derive(Deserialize)]
struct RawModel {
    /// Declared capabilities: a list of names or a `{name: bool}` map.
    #[serde(default)]
    capabilities: Option<serde_json::Value>,
    /// Context window under one of its common names.
    #[serde(default, alias = "max_model_len", alias = "context_window")]
    context_length: Option<u64>,
    /// Model identifier.
    id: String,
}

/// Success response of an operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseShape {
    /// First declared content type.
    pub content_type: Option<String>,
    /// Top-level fields of the response schema.
    pub fields: Vec<String>,
    /// Status code key (`200`, `201`, `default`, ...).
    pub status: Option<String>,
}

/// One path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Fixed text.
    Literal(String),
    /// Placeholder with the literal text around it.
    Param {
        /// Text before the placeholder.
        prefix: String,
        /// Text after the placeholder.
        suffix: String,
    },
}

impl Segment {
    /// Whether a documented segment fits this contract segment.
    fn accepts(&self, documented: &Self) -> bool {
        return match (self, documented) {
            (Self::Literal(ours), Self::Literal(theirs)) => ours == theirs,
            (Self::Literal(_), Self::Param { .. }) => false,
            (Self::Param { prefix, suffix }, Self::Literal(value)) => {
                value.len() > prefix.len().saturating_add(suffix.len())
                    && value.starts_with(prefix.as_str())
                    && value.ends_with(suffix.as_str())
            },
            (Self::Param { prefix, suffix }, Self::Param { prefix: p, suffix: s }) => {
                prefix == p && suffix == s
            },
        };
    }

    /// Parse one segment, recognizing a single placeholder. An unnamed
    /// placeholder (`{}`) is still a placeholder.
    fn parse(segment: &str) -> Self {
        if let Some(name) = segment.strip_prefix(':')
            && !name.is_empty()
        {
            return Self::Param { prefix: String::new(), suffix: String::new() };
        }
        for (open, close) in [("${", "}"), ("{", "}"), ("<", ">")] {
            let Some(start) = segment.find(open) else {
                continue;
            };
            let after_open = start.saturating_add(open.len());
            let Some(rest) = segment.get(after_open..) else {
                continue;
            };
            let Some(len) = rest.find(close) else {
                continue;
            };
            let suffix_start = after_open.saturating_add(len).saturating_add(close.len());
            return Self::Param {
                prefix: segment.get(..start).unwrap_or("").to_string(),
                suffix: segment.get(suffix_start..).unwrap_or("").to_string(),
            };
        }
        return Self::Literal(segment.to_string());
    }
}

impl ApiContract {
    /// Look up the endpoint a documented request targets.
    ///
    /// Tries the path as written, then with each server base path removed.
    /// Among fitting templates the one with the most literal segments wins,
    /// so `/models/list` beats `/models/{id}`.
    pub fn find(&self, method: &str, path: &str) -> Option<&Endpoint> {
        let method = method.to_ascii_uppercase();
        let documented = PathTemplate::parse(path);

        let mut candidates = vec![documented.clone()];
        for base in &self.base_paths {
            if let Some(stripped) = documented.strip_prefix(base) {
                candidates.push(stripped);
            }
        }

        return candidates
            .iter()
            .filter_map(|candidate| {
                return self
                    .endpoints
                    .values()
                    .filter(|e| return e.method == method && e.template.matches(candidate))
                    .max_by_key(|e| return e.template.literal_count());
            })
            .max_by_key(|e| return e.template.literal_count());
    }

    /// Whether any endpoint, under any method, serves this path.
    pub fn knows_path(&self, path: &str) -> bool {
        let mut methods: Vec<&str> = self.endpoints.keys().map(|k| return k.method.as_str()).collect();
        methods.dedup();
        return methods.iter().any(|method| return self.find(method, path).is_some());
    }

    /// Merge a models list into the contract, replacing any earlier one.
    pub fn merge_models(&mut self, models: BTreeMap<String, ModelInfo>) {
        self.models = Some(models);
    }

    /// Path prefixes that mark a URL as an API call: server base paths,
    /// versioned first segments (`/v2`) of contract paths, and `/v1`.
    pub fn path_prefixes(&self) -> Vec<String> {
        let mut prefixes: Vec<String> = self.base_paths.clone();
        for endpoint in self.endpoints.values() {
            if let Some(Segment::Literal(first)) = endpoint.template.segments.first()
                && is_version_segment(first)
            {
                prefixes.push(format!("/{first}"));
            }
        }
        prefixes.push(DEFAULT_API_PREFIX.to_string());
        prefixes.sort();
        prefixes.dedup();
        return prefixes;
    }
}

/// Whether a URL path sits under one of the API prefixes.
pub fn is_api_path(path: &str, prefixes: &[String]) -> bool {
    return prefixes.iter().any(|prefix| {
        let prefix = prefix.trim_end_matches('/');
        return path == prefix
            || path.strip_prefix(prefix).is_some_and(|rest| return rest.starts_with(['/', '?']));
    });
}

/// `v1`, `v2beta`, ...
fn is_version_segment(segment: &str) -> bool {
    let Some(rest) = segment.strip_prefix('v') else {
        return false;
    };
    return rest.chars().next().is_some_and(|c| return c.is_ascii_digit());
}

/// Read and parse a contract document.
///
/// # Errors
///
/// Returns `ContractLoadError::Unreadable` if the file cannot be read, or any
/// error from [`parse`].
pub fn load(file: &Path) -> Result<ApiContract, ContractLoadError> {
    let text = std::fs::read_to_string(file)
        .map_err(|source| return ContractLoadError::Unreadable { file: file.to_path_buf(), source })?;
    let contract = parse(file, &text)?;
    tracing::info!(
        file = %file.display(),
        endpoints = contract.endpoints.len(),
        base_paths = ?contract.base_paths,
        "contract loaded"
    );
    return Ok(contract);
}

/// Parse a contract document. JSON files (by extension, or text opening with
/// `{`) go through `serde_json`, everything else through `serde_yaml`.
///
/// # Errors
///
/// Returns `ContractLoadError::Invalid` for unparsable documents,
/// `ContractLoadError::MissingField` when `openapi`/`swagger`, `info` or
/// `paths` is absent, or `ContractLoadError::DuplicateEndpoint` when two
/// operations normalize to the same key.
pub fn parse(file: &Path, text: &str) -> Result<ApiContract, ContractLoadError> {
    let is_json = file.extension().is_some_and(|e| return e.eq_ignore_ascii_case("json"))
        || text.trim_start().starts_with('{');
    let root: Value = if is_json {
        serde_json::from_str(text).map_err(|e| {
            return ContractLoadError::Invalid { file: file.to_path_buf(), reason: e.to_string() };
        })?
    } else {
        serde_yaml::from_str(text).map_err(|e| {
            return ContractLoadError::Invalid { file: file.to_path_buf(), reason: e.to_string() };
        })?
    };

    let missing = |field: &'static str| {
        return ContractLoadError::MissingField { field, file: file.to_path_buf() };
    };
    if root.get("openapi").is_none() && root.get("swagger").is_none() {
        return Err(missing("openapi"));
    }
    if !root.get("info").is_some_and(Value::is_mapping) {
        return Err(missing("info"));
    }
    let Some(paths) = root.get("paths").and_then(Value::as_mapping) else {
        return Err(missing("paths"));
    };

    let mut endpoints = BTreeMap::new();
    for (raw_path, item) in paths {
        let Some(raw_path) = raw_path.as_str() else {
            continue;
        };
        let item = resolve(&root, item);
        let shared = item.get("parameters");

        for method in HTTP_METHODS {
            let Some(operation) = item.get(method) else {
                continue;
            };
            let template = PathTemplate::parse(raw_path);
            let key = EndpointKey { method: method.to_ascii_uppercase(), path: template.normalized() };
            if endpoints.contains_key(&key) {
                return Err(ContractLoadError::DuplicateEndpoint {
                    file: file.to_path_buf(),
                    method: key.method,
                    path: key.path,
                });
            }
            let endpoint = Endpoint {
                method: key.method.clone(),
                parameters: operation_parameters(&root, shared, operation),
                response: response_shape(&root, operation),
                template,
            };
            endpoints.insert(key, endpoint);
        }
    }

    return Ok(ApiContract {
        base_paths: base_paths(&root),
        endpoints,
        file: file.to_path_buf(),
        models: None,
    });
}

/// Parse a models-list body: `{"data": [{"id": ...}, ...]}` or a bare array.
///
/// # Errors
///
/// Returns the `serde_json` error if the body is not a models list.
pub fn parse_models(text: &str) -> Result<BTreeMap<String, ModelInfo>, serde_json::Error> {
    let body: ModelsBody = serde_json::from_str(text)?;
    let (ModelsBody::Bare(models) | ModelsBody::Wrapped { data: models }) = body;

    let mut out = BTreeMap::new();
    for model in models {
        let capabilities = match model.capabilities {
            Some(serde_json::Value::Array(items)) => {
                items.iter().filter_map(|v| return v.as_str().map(String::from)).collect()
            },
            Some(serde_json::Value::Object(map)) => map
                .iter()
                .filter(|(_, v)| return v.as_bool().unwrap_or(false))
                .map(|(k, _)| return k.clone())
                .collect(),
            _ => Vec::new(),
        };
        out.insert(model.id, ModelInfo { capabilities, context_length: model.context_length });
    }
    return Ok(out);
}

/// Server base paths: OpenAPI 3 `servers[].url` paths or Swagger 2 `basePath`.
fn base_paths(root: &Value) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(servers) = root.get("servers").and_then(Value::as_sequence) {
        for server in servers {
            let Some(url) = server.get("url").and_then(Value::as_str) else {
                continue;
            };
            let path = match url.split_once("://") {
                Some((_, rest)) => rest.find('/').and_then(|i| return rest.get(i..)).unwrap_or(""),
                None if url.starts_with('/') => url,
                None => "",
            };
            out.push(path.trim_end_matches('/').to_string());
        }
    }
    if let Some(base) = root.get("basePath").and_then(Value::as_str) {
        out.push(base.trim_end_matches('/').to_string());
    }
    out.retain(|p| return !p.is_empty());
    out.sort();
    out.dedup();
    return out;
}

/// Collect request-body schema fields as body parameters.
fn body_parameters(root: &Value, schema: &Value, out: &mut Vec<Parameter>) {
    let mut fields = Vec::new();
    schema_fields(root, schema, 0, &mut fields);
    for (name, required, schema_type) in fields {
        push_parameter(out, Parameter { location: ParamLocation::Body, name, required, schema_type });
    }
}

/// Path-level then operation-level parameters, plus request-body fields.
/// An operation parameter overrides a path parameter with the same name and location.
fn operation_parameters(root: &Value, shared: Option<&Value>, operation: &Value) -> Vec<Parameter> {
    let mut out: Vec<Parameter> = Vec::new();

    let declared = [shared, operation.get("parameters")];
    for list in declared.into_iter().flatten().filter_map(Value::as_sequence) {
        for raw in list {
            let param = resolve(root, raw);
            let Some(name) = param.get("name").and_then(Value::as_str) else {
                continue;
            };
            let Some(location) = param.get("in").and_then(Value::as_str).and_then(ParamLocation::from_in)
            else {
                continue;
            };
            if location == ParamLocation::Body && param.get("in").and_then(Value::as_str) == Some("body") {
                if let Some(schema) = param.get("schema") {
                    body_parameters(root, schema, &mut out);
                }
                continue;
            }
            let schema = param.get("schema").map_or(param, |s| return resolve(root, s));
            out.retain(|p| return !(p.name == name && p.location == location));
            out.push(Parameter {
                location,
                name: name.to_string(),
                required: param.get("required").and_then(Value::as_bool).unwrap_or(false),
                schema_type: type_name(schema),
            });
        }
    }

    if let Some(content) = operation
        .get("requestBody")
        .map(|b| return resolve(root, b))
        .and_then(|b| return b.get("content"))
        .and_then(Value::as_mapping)
    {
        for media in content.values() {
            if let Some(schema) = media.get("schema") {
                body_parameters(root, schema, &mut out);
            }
        }
    }

    return out;
}

/// Add a parameter unless one with the same name and location is present.
fn push_parameter(out: &mut Vec<Parameter>, param: Parameter) {
    if !out.iter().any(|p| return p.name == param.name && p.location == param.location) {
        out.push(param);
    }
}

/// Follow a local `$ref` (`#/components/schemas/X`). Unresolvable or
/// external references return the value unchanged.
fn resolve<'a>(root: &'a Value, value: &'a Value) -> &'a Value {
    let mut current = value;
    for _ in 0..MAX_SCHEMA_DEPTH {
        let Some(pointer) = current.get("$ref").and_then(Value::as_str) else {
            return current;
        };
        let Some(path) = pointer.strip_prefix("#/") else {
            return current;
        };
        let mut target = root;
        for part in path.split('/') {
            let key = part.replace("~1", "/").replace("~0", "~");
            let Some(next) = target.get(key.as_str()) else {
                return current;
            };
            target = next;
        }
        current = target;
    }
    return current;
}

/// Describe the first success response: 200, 201, 202, 204, any other 2xx,
/// then `default`.
fn response_shape(root: &Value, operation: &Value) -> ResponseShape {
    let Some(responses) = operation.get("responses").and_then(Value::as_mapping) else {
        return ResponseShape::default();
    };

    let key_of = |k: &Value| -> Option<String> {
        return match k {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) => Some(s.clone()),
            _ => None,
        };
    };
    let mut chosen: Option<(String, &Value)> = None;
    for preferred in ["200", "201", "202", "204"] {
        chosen = responses
            .iter()
            .find(|(k, _)| return key_of(k).as_deref() == Some(preferred))
            .and_then(|(k, v)| return key_of(k).map(|s| return (s, v)));
        if chosen.is_some() {
            break;
        }
    }
    if chosen.is_none() {
        chosen = responses
            .iter()
            .filter_map(|(k, v)| return key_of(k).map(|s| return (s, v)))
            .find(|(k, _)| return k.starts_with('2') || k == "default");
    }
    let Some((status, response)) = chosen else {
        return ResponseShape::default();
    };
    let response = resolve(root, response);

    let (content_type, schema) = match response.get("content").and_then(Value::as_mapping) {
        Some(content) => content
            .iter()
            .next()
            .map_or((None, None), |(k, v)| return (k.as_str().map(String::from), v.get("schema"))),
        None => (None, response.get("schema")),
    };

    let mut fields = Vec::new();
    if let Some(schema) = schema {
        schema_fields(root, schema, 0, &mut fields);
    }
    return ResponseShape {
        content_type,
        fields: fields.into_iter().map(|(name, _, _)| return name).collect(),
        status: Some(status),
    };
}

/// Flatten an object schema's top-level properties as `(name, required, type)`,
/// following `$ref` and merging `allOf`/`oneOf`/`anyOf` branches.
fn schema_fields(root: &Value, schema: &Value, depth: u8, out: &mut Vec<(String, bool, String)>) {
    if depth >= MAX_SCHEMA_DEPTH {
        return;
    }
    let schema = resolve(root, schema);

    for composition in ["allOf", "oneOf", "anyOf"] {
        if let Some(branches) = schema.get(composition).and_then(Value::as_sequence) {
            for branch in branches {
                schema_fields(root, branch, depth.saturating_add(1), out);
            }
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_mapping) else {
        return;
    };
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_sequence)
        .map(|r| return r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    for (name, property) in properties {
        let Some(name) = name.as_str() else {
            continue;
        };
        if out.iter().any(|(n, _, _)| return n == name) {
            continue;
        }
        let property = resolve(root, property);
        out.push((name.to_string(), required.contains(&name), type_name(property)));
    }
}

/// Schema `type`, `array<item>` for arrays, `any` when absent.
fn type_name(schema: &Value) -> String {
    let Some(kind) = schema.get("type").and_then(Value::as_str) else {
        if schema.get("properties").is_some() {
            return "object".to_string();
        }
        return "any".to_string();
    };
    if kind == "array"
        && let Some(item) = schema.get("items").and_then(|i| return i.get("type")).and_then(Value::as_str)
    {
        return format!("array<{item}>");
    }
    return kind.to_string();
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPENAPI: &str = r##"
openapi: 3.0.3
info:
  title: Inference API
  version: "1.0"
servers:
  - url: https://api.example.com/v1
paths:
  /models:
    get:
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema:
                $ref: "#/components/schemas/ModelList"
  /models/{model_id}:
    parameters:
      - name: model_id
        in: path
        required: true
        schema: { type: string }
    get:
      responses:
        "200": { description: ok }
  /chat/completions:
    post:
      parameters:
        - name: api_key
          in: query
          schema: { type: string }
      requestBody:
        content:
          application/json:
            schema:
              $ref: "#/components/schemas/ChatRequest"
      responses:
        "200": { description: ok }
components:
  schemas:
    ModelList:
      type: object
      properties:
        object: { type: string }
        data: { type: array, items: { type: object } }
    ChatRequest:
      allOf:
        - $ref: "#/components/schemas/Sampling"
        - type: object
          required: [model, messages]
          properties:
            model: { type: string }
            messages: { type: array, items: { type: object } }
    Sampling:
      type: object
      properties:
        temperature: { type: number }
        max_tokens: { type: integer }
"##;

    fn contract() -> ApiContract {
        return parse(Path::new("openapi.yaml"), OPENAPI).unwrap();
    }

    #[test]
    fn endpoints_keyed_by_normalized_path() {
        let keys: Vec<String> = contract().endpoints.keys().map(ToString::to_string).collect();
        assert_eq!(keys, vec!["GET /models", "GET /models/{}", "POST /chat/completions"]);
    }

    #[test]
    fn servers_give_base_paths() {
        assert_eq!(contract().base_paths, vec!["/v1"]);
    }

    #[test]
    fn body_and_query_parameters_flattened() {
        let contract = contract();
        let chat = contract.find("post", "/v1/chat/completions").unwrap();
        let mut names: Vec<&str> = chat.parameters.iter().map(|p| p.name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["api_key", "max_tokens", "messages", "model", "temperature"]);
        let model = chat.parameters.iter().find(|p| p.name == "model").unwrap();
        assert!(model.required);
        assert_eq!(model.location, ParamLocation::Body);
    }

    #[test]
    fn response_shape_follows_ref() {
        let contract = contract();
        let list = contract.find("GET", "/v1/models").unwrap();
        assert_eq!(list.response.status.as_deref(), Some("200"));
        assert_eq!(list.response.content_type.as_deref(), Some("application/json"));
        assert_eq!(list.response.fields, vec!["object", "data"]);
    }

    #[test]
    fn concrete_value_matches_placeholder() {
        let contract = contract();
        let model = contract.find("GET", "/v1/models/llama-3-8b").unwrap();
        assert_eq!(model.template.raw, "/models/{model_id}");
        let by_placeholder = contract.find("GET", "/v1/models/{id}").unwrap();
        assert_eq!(by_placeholder.template.raw, "/models/{model_id}");
    }

    #[test]
    fn literal_beats_placeholder() {
        let contract = contract();
        assert_eq!(contract.find("GET", "/models").unwrap().template.raw, "/models");
    }

    #[test]
    fn unknown_method_or_path_not_found() {
        let contract = contract();
        assert!(contract.find("POST", "/v1/models").is_none());
        assert!(contract.find("POST", "/v1/fake-endpoint").is_none());
    }

    #[test]
    fn placeholder_syntaxes_normalize_alike() {
        for raw in ["/files/{id}/content", "/files/:id/content", "/files/<id>/content", "/files/${id}/content"] {
            assert_eq!(PathTemplate::parse(raw).normalized(), "/files/{}/content");
        }
        assert_eq!(PathTemplate::parse("/files/{id}.json").normalized(), "/files/{}.json");
        let template = PathTemplate::parse("/files/{id}.json");
        assert!(template.matches(&PathTemplate::parse("/files/abc.json")));
        assert!(!template.matches(&PathTemplate::parse("/files/abc.txt")));
    }

    #[test]
    fn unnamed_placeholder_is_a_parameter() {
        let template = PathTemplate::parse("/files/{}/content");
        assert_eq!(template.normalized(), "/files/{}/content");
        assert_eq!(template.literal_count(), 2);
        assert!(template.matches(&PathTemplate::parse("/files/abc/content")));

        let text = "openapi: 3.0.0\ninfo: {title: x}\npaths:\n  /m/{}:\n    get: {}\n  /m/{id}:\n    get: {}\n";
        let err = parse(Path::new("a.yaml"), text).unwrap_err();
        assert!(matches!(err, ContractLoadError::DuplicateEndpoint { .. }));
    }

    #[test]
    fn missing_required_fields() {
        let no_marker = parse(Path::new("a.yaml"), "info: {title: x}\npaths: {}\n").unwrap_err();
        assert!(matches!(no_marker, ContractLoadError::MissingField { field: "openapi", .. }));
        let no_info = parse(Path::new("a.yaml"), "openapi: 3.0.0\npaths: {}\n").unwrap_err();
        assert!(matches!(no_info, ContractLoadError::MissingField { field: "info", .. }));
        let no_paths = parse(Path::new("a.yaml"), "swagger: \"2.0\"\ninfo: {title: x}\n").unwrap_err();
        assert!(matches!(no_paths, ContractLoadError::MissingField { field: "paths", .. }));
    }

    #[test]
    fn duplicate_after_normalization_rejected() {
        let text = "openapi: 3.0.0\ninfo: {title: x}\npaths:\n  /m/{a}:\n    get: {}\n  /m/{b}:\n    get: {}\n";
        let err = parse(Path::new("a.yaml"), text).unwrap_err();
        assert!(matches!(err, ContractLoadError::DuplicateEndpoint { .. }));
    }

    #[test]
    fn json_contract_and_swagger_body() {
        let text = r#"{"swagger":"2.0","info":{"title":"x"},"basePath":"/api/","paths":{"/embed":{"post":{"parameters":[{"name":"payload","in":"body","schema":{"properties":{"input":{"type":"string"}}}}]}}}}"#;
        let contract = parse(Path::new("swagger.json"), text).unwrap();
        assert_eq!(contract.base_paths, vec!["/api"]);
        let embed = contract.find("POST", "/api/embed").unwrap();
        assert!(embed.has_parameter("input"));
    }

    #[test]
    fn invalid_document() {
        let err = parse(Path::new("a.yaml"), "openapi: [unclosed\n").unwrap_err();
        assert!(matches!(err, ContractLoadError::Invalid { .. }));
    }

    #[test]
    fn models_list_parsed() {
        let body = r#"{"object":"list","data":[{"id":"llama-3-8b","context_length":8192,"capabilities":["chat"]},{"id":"bge-m3","capabilities":{"embeddings":true,"chat":false}}]}"#;
        let models = parse_models(body).unwrap();
        assert_eq!(models["llama-3-8b"].context_length, Some(8192));
        assert_eq!(models["bge-m3"].capabilities, vec!["embeddings"]);
        assert!(parse_models("[{\"id\":\"x\"}]").unwrap().contains_key("x"));
        assert!(parse_models("{\"nope\":1}").is_err());
    }

    #[test]
    fn api_prefixes() {
        let prefixes = contract().path_prefixes();
        assert_eq!(prefixes, vec!["/v1"]);
        assert!(is_api_path("/v1/models", &prefixes));
        assert!(!is_api_path("/v10/models", &prefixes));
        assert!(!is_api_path("/docs/v1", &prefixes));
    }
}
