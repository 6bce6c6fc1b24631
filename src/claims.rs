//! Endpoint claims: the requests that code samples in the docs say the API
//! accepts. Samples are read heuristically (curl, raw HTTP, common HTTP
//! clients, configured SDK calls); anything the readers cannot pin down is
//! reported as a miss instead of guessed at.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::SdkCall;
use crate::contract::{self, ApiContract};
use crate::model::{CodeBlock, DocumentSet};

/// `requests.post(`, `httpx.get(`, `axios.put(`, `session.delete(` ...
#[allow(clippy::expect_used, reason = "literal regex, checked by tests")]
static CLIENT_CALL: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"\b(?:requests|httpx|axios|session|client|http)\.(get|post|put|patch|delete|head)\s*\(")
        .expect("valid regex");
});

/// `fetch(`.
#[allow(clippy::expect_used, reason = "literal regex, checked by tests")]
static FETCH_CALL: LazyLock<Regex> = LazyLock::new(|| return Regex::new(r"\bfetch\s*\(").expect("valid regex"));

/// `method: "POST"` inside a fetch options object.
#[allow(clippy::expect_used, reason = "literal regex, checked by tests")]
static FETCH_METHOD: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r#"\bmethod\s*:\s*["'`]([A-Za-z]+)["'`]"#).expect("valid regex");
});

/// `json=` / `data=` / `params=` keyword arguments.
#[allow(clippy::expect_used, reason = "literal regex, checked by tests")]
static KWARG_PAYLOAD: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"\b(json|data|params)\s*=\s*([A-Za-z_]\w*|\{)").expect("valid regex");
});

/// `"model": "id"`, `model="id"`, `model: 'id'`.
#[allow(clippy::expect_used, reason = "literal regex, checked by tests")]
static MODEL_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r#"["']?\bmodel["']?\s*[:=]\s*["']([^"'\s]+)["']"#).expect("valid regex");
});

/// `POST /v1/chat/completions HTTP/1.1` on a line of its own.
#[allow(clippy::expect_used, reason = "literal regex, checked by tests")]
static REQUEST_LINE: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(
        r"(?m)^[ \t]*(?:\$[ \t]*)?(GET|POST|PUT|PATCH|DELETE|HEAD|OPTIONS)[ \t]+(\S+)(?:[ \t]+HTTP/[\d.]+)?[ \t]*\r?$",
    )
    .expect("valid regex");
});

/// `JSON.stringify(` in a fetch body.
#[allow(clippy::expect_used, reason = "literal regex, checked by tests")]
static STRINGIFY: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"JSON\.stringify\s*\(\s*([A-Za-z_$][\w$]*|\{)").expect("valid regex"));

/// Absolute URLs in free text.
#[allow(clippy::expect_used, reason = "literal regex, checked by tests")]
static URL: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r#"https?://[^\s"'`<>)\]]+"#).expect("valid regex"));

/// Code block languages that hold data or output, never requests.
const DATA_LANGUAGES: &[&str] = &[
    "diff", "json", "jsonc", "log", "markdown", "md", "mermaid", "output", "plaintext", "text", "toml", "txt",
    "yaml", "yml",
];

/// curl options that consume the following word.
const CURL_VALUE_FLAGS: &[&str] = &[
    "-A",
    "-b",
    "-c",
    "-e",
    "-H",
    "-m",
    "-o",
    "-T",
    "-u",
    "-w",
    "-x",
    "--cacert",
    "--cert",
    "--connect-timeout",
    "--cookie",
    "--cookie-jar",
    "--header",
    "--key",
    "--max-time",
    "--output",
    "--proxy",
    "--referer",
    "--retry",
    "--upload-file",
    "--user",
    "--user-agent",
    "--write-out",
];

/// SDK keyword arguments that configure the transport rather than the request.
const SDK_TRANSPORT_KWARGS: &[&str] = &["extra_body", "extra_headers", "extra_query", "timeout"];

/// How a claim was read out of a sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimSource {
    /// A `curl` command.
    Curl,
    /// A `fetch(...)` call.
    Fetch,
    /// `requests`/`httpx`/`axios`-style client call.
    HttpClient,
    /// A raw `METHOD /path` request line.
    RequestLine,
    /// A configured SDK call such as `chat.completions.create`.
    Sdk {
        /// Method chain as configured.
        call: String,
    },
}

/// A request a code sample documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointClaim {
    /// The URL's origin and path were written out literally.
    pub confident: bool,
    /// One-based source line the request starts on.
    pub line: u32,
    /// Upper-cased HTTP method.
    pub method: String,
    /// Model identifiers the request names.
    pub models: Vec<String>,
    /// Parameter names: top-level body keys, query keys, form fields.
    pub parameters: Vec<String>,
    /// URL path as documented, query and fragment removed.
    pub path: String,
    /// Slug of the page the sample is on.
    pub slug: String,
    /// Which reader produced the claim.
    pub source: ClaimSource,
}

/// What the readers need to know about the API.
#[derive(Debug)]
pub struct ClaimContext<'a> {
    /// Host of the canonical base URL, if configured.
    pub api_host: Option<String>,
    /// Loaded contract, used to recognize API paths without a prefix.
    pub contract: Option<&'a ApiContract>,
    /// Values containing one of these are placeholders, not real values.
    pub placeholders: &'a [String],
    /// Path prefixes that mark an API call.
    pub prefixes: Vec<String>,
    /// SDK calls to recognize.
    pub sdk_calls: &'a [SdkCall],
}

impl ClaimContext<'_> {
    /// Whether a URL points at the documented API.
    fn is_api(&self, url: &UrlParts) -> bool {
        if url.variable_base || contract::is_api_path(&url.path, &self.prefixes) {
            return true;
        }
        if let (Some(host), Some(api_host)) = (&url.host, &self.api_host)
            && host.eq_ignore_ascii_case(api_host)
        {
            return true;
        }
        return self.contract.is_some_and(|c| return c.knows_path(&url.path));
    }

    /// Whether a value is a placeholder.
    fn is_placeholder(&self, value: &str) -> bool {
        return self.placeholders.iter().any(|marker| return value.contains(marker.as_str()));
    }
}

/// A parsed curl invocation.
#[derive(Debug, Default)]
struct CurlRequest {
    /// `-d`/`--json` payloads, unparsed.
    bodies: Vec<String>,
    /// `-F` field names, plus `-G` query keys.
    form_fields: Vec<String>,
    /// Upper-cased method, explicit or implied.
    method: String,
    /// Byte offset of the `curl` word.
    start: usize,
    /// First non-option argument or `--url`.
    url: String,
}

/// Everything pulled out of a document set.
#[derive(Debug, Default)]
pub struct Extraction {
    /// Claims in page order, then source order.
    pub claims: Vec<EndpointClaim>,
    /// Samples that mention the API but yielded no claim.
    pub misses: Vec<Miss>,
}

/// A sample the readers could not interpret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Miss {
    /// One-based first line of the sample.
    pub line: u32,
    /// What was seen.
    pub reason: String,
    /// Page slug.
    pub slug: String,
}

/// Pieces of a URL relevant to matching.
#[derive(Debug, Clone, PartialEq, Eq)]
struct UrlParts {
    /// Literal host, when written out.
    host: Option<String>,
    /// Path without query or fragment; `/` at minimum.
    path: String,
    /// Query parameter names.
    query: Vec<String>,
    /// The URL starts with a variable such as `$BASE_URL`.
    variable_base: bool,
}

/// A shell word or a command separator.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ShellToken {
    /// Newline, `;`, `|` or `&`.
    Separator,
    /// A word with quotes and escapes resolved.
    Word {
        /// Byte offset where the word starts.
        start: usize,
        /// Resolved text.
        text: String,
    },
}

/// Read every code block in the set.
pub fn extract(set: &DocumentSet, context: &ClaimContext<'_>) -> Extraction {
    let mut extraction = Extraction::default();

    for page in set.pages.values() {
        for block in &page.code_blocks {
            let claims = extract_block(&page.path, block, context);
            if claims.is_empty() {
                if let Some(reason) = api_mention(block, context) {
                    tracing::debug!(slug = %page.path, line = block.line, %reason, "sample not understood");
                    extraction.misses.push(Miss { line: block.line, reason, slug: page.path.clone() });
                }
                continue;
            }
            extraction.claims.extend(claims);
        }
    }

    tracing::info!(
        claims = extraction.claims.len(),
        misses = extraction.misses.len(),
        "endpoint claims extracted"
    );
    return extraction;
}

/// Claims from one code block, deduplicated by line, method and path.
pub fn extract_block(slug: &str, block: &CodeBlock, context: &ClaimContext<'_>) -> Vec<EndpointClaim> {
    let mut claims = Vec::new();
    curl_claims(slug, block, context, &mut claims);
    request_line_claims(slug, block, context, &mut claims);
    client_claims(slug, block, context, &mut claims);
    fetch_claims(slug, block, context, &mut claims);
    sdk_claims(slug, block, context, &mut claims);

    let mut seen = HashSet::new();
    claims.retain(|c| return seen.insert((c.line, c.method.clone(), c.path.clone())));
    claims.sort_by_key(|c| return c.line);
    return claims;
}

/// Why a block without claims still looks like it talks to the API.
fn api_mention(block: &CodeBlock, context: &ClaimContext<'_>) -> Option<String> {
    if block.language.as_deref().is_some_and(|lang| return DATA_LANGUAGES.contains(&lang)) {
        return None;
    }
    for url in URL.find_iter(&block.text) {
        if let Some(parts) = split_url(url.as_str())
            && context.is_api(&parts)
        {
            return Some(format!("references `{}` but no request could be read", url.as_str()));
        }
    }
    if shell_commands(&block.text).iter().any(|words| return is_curl(words)) {
        return Some("contains a curl command whose URL could not be read".to_string());
    }
    return None;
}

/// Keys assigned by `name = {` / `const name = {` elsewhere in the block.
fn assigned_object_keys(text: &str, name: &str) -> Vec<String> {
    let Ok(assignment) = Regex::new(&format!(r"\b{}\s*=\s*\{{", regex::escape(name))) else {
        return Vec::new();
    };
    let Some(found) = assignment.find(text) else {
        return Vec::new();
    };
    return top_level_keys(text, found.end().saturating_sub(1), ':');
}

/// Build a claim if the URL reads and points at the API.
fn build_claim(
    slug: &str,
    line: u32,
    method: &str,
    url: &str,
    context: &ClaimContext<'_>,
    source: ClaimSource,
) -> Option<(EndpointClaim, Vec<String>)> {
    let parts = split_url(url)?;
    if !context.is_api(&parts) {
        return None;
    }
    let claim = EndpointClaim {
        confident: !parts.variable_base,
        line,
        method: method.to_ascii_uppercase(),
        models: Vec::new(),
        parameters: Vec::new(),
        path: parts.path,
        slug: slug.to_string(),
        source,
    };
    return Some((claim, parts.query));
}

/// `requests.post(url, json={...})` and friends.
fn client_claims(slug: &str, block: &CodeBlock, context: &ClaimContext<'_>, claims: &mut Vec<EndpointClaim>) {
    for cap in CLIENT_CALL.captures_iter(&block.text) {
        let (Some(whole), Some(method)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        let open = whole.end().saturating_sub(1);
        let Some(span) = call_span(&block.text, open) else {
            continue;
        };
        let Some(url) = first_argument_url(span.get(1..).unwrap_or("")) else {
            continue;
        };
        let line = block.line_of(whole.start());
        let Some((mut claim, query)) =
            build_claim(slug, line, method.as_str(), &url, context, ClaimSource::HttpClient)
        else {
            continue;
        };

        claim.parameters = query;
        let mut payload_found = false;
        for kwarg in KWARG_PAYLOAD.captures_iter(span) {
            let Some(value) = kwarg.get(2) else {
                continue;
            };
            payload_found = true;
            claim.parameters.extend(payload_keys(&block.text, span, value));
        }
        if !payload_found && let Some(object) = second_argument_object(span) {
            claim.parameters.extend(top_level_keys(span, object, ':'));
        }
        claim.models = models_in(span, context);
        claims.push(claim);
    }
}

/// Parse every `curl` command in the block.
fn curl_claims(slug: &str, block: &CodeBlock, context: &ClaimContext<'_>, claims: &mut Vec<EndpointClaim>) {
    for words in shell_commands(&block.text) {
        if !is_curl(&words) {
            continue;
        }
        let Some(request) = parse_curl(&words) else {
            continue;
        };
        let line = block.line_of(request.start);
        let Some((mut claim, query)) =
            build_claim(slug, line, &request.method, &request.url, context, ClaimSource::Curl)
        else {
            continue;
        };

        claim.parameters = query;
        for body in &request.bodies {
            claim.parameters.extend(body_keys(body));
        }
        claim.parameters.extend(request.form_fields);
        claim.models = models_in(&request.bodies.join("\n"), context);
        claims.push(claim);
    }
}

/// Top-level keys of a request body written as JSON or `a=1&b=2`.
fn body_keys(body: &str) -> Vec<String> {
    let trimmed = body.trim_start();
    if trimmed.starts_with('{') {
        return top_level_keys(trimmed, 0, ':');
    }
    if trimmed.starts_with(['@', '[']) {
        return Vec::new();
    }
    return query_keys(trimmed);
}

/// Byte span of the parenthesized call opening at `open`, parens included.
fn call_span(text: &str, open: usize) -> Option<&str> {
    let close = matching_close(text, open)?;
    return text.get(open..=close);
}

/// `fetch(url, { method, body: JSON.stringify({...}) })`.
fn fetch_claims(slug: &str, block: &CodeBlock, context: &ClaimContext<'_>, claims: &mut Vec<EndpointClaim>) {
    for found in FETCH_CALL.find_iter(&block.text) {
        let open = found.end().saturating_sub(1);
        let Some(span) = call_span(&block.text, open) else {
            continue;
        };
        let Some(url) = first_argument_url(span.get(1..).unwrap_or("")) else {
            continue;
        };
        let method = FETCH_METHOD
            .captures(span)
            .and_then(|cap| return cap.get(1))
            .map_or("GET", |m| return m.as_str());
        let line = block.line_of(found.start());
        let Some((mut claim, query)) = build_claim(slug, line, method, &url, context, ClaimSource::Fetch) else {
            continue;
        };

        claim.parameters = query;
        if let Some(value) = STRINGIFY.captures(span).and_then(|cap| return cap.get(1)) {
            claim.parameters.extend(payload_keys(&block.text, span, value));
        }
        claim.models = models_in(span, context);
        claims.push(claim);
    }
}

/// The URL expression that opens an argument list, as a string with any
/// variable parts kept as `${name}`. Concatenation with `+` is followed.
fn first_argument_url(args: &str) -> Option<String> {
    let mut url = String::new();
    let mut rest = args.trim_start();

    loop {
        let literal_start = rest.find(['"', '\'', '`']);
        let prefix_len = literal_start.unwrap_or(0);
        let prefix = rest.get(..prefix_len).unwrap_or("");

        if let Some(start) = literal_start
            && prefix.chars().all(|c| return matches!(c, 'f' | 'r' | 'b' | 'u' | 'F' | 'R'))
        {
            let quote = rest.get(start..).and_then(|s| return s.chars().next())?;
            let body = rest.get(start.saturating_add(1)..)?;
            let end = body.find(quote)?;
            url.push_str(body.get(..end)?);
            rest = body.get(end.saturating_add(1)..)?.trim_start();
        } else {
            let end = rest.find(|c: char| return !(c.is_alphanumeric() || matches!(c, '_' | '.' | '$')))?;
            let name = rest.get(..end)?;
            if name.is_empty() {
                return None;
            }
            url.push_str("${");
            url.push_str(name);
            url.push('}');
            rest = rest.get(end..)?.trim_start();
        }

        let Some(more) = rest.strip_prefix('+') else {
            break;
        };
        rest = more.trim_start();
    }

    if !rest.starts_with([',', ')']) {
        return None;
    }
    return Some(url);
}

/// Whether a shell command (prompt and env assignments skipped) runs curl.
fn is_curl(words: &[(usize, String)]) -> bool {
    return words
        .iter()
        .find(|(_, w)| return !matches!(w.as_str(), "$" | ">" | "sudo") && !is_env_assignment(w))
        .is_some_and(|(_, w)| return w == "curl" || w == "curl.exe" || w.ends_with("/curl"));
}

/// `NAME=value` shell prefix.
fn is_env_assignment(word: &str) -> bool {
    let Some((name, _)) = word.split_once('=') else {
        return false;
    };
    return !name.is_empty() && name.chars().all(|c| return c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
}

/// Index of the bracket closing the one at `open`, skipping string literals.
fn matching_close(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0_usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (offset, c) in text.get(open..)?.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' | '`' => quote = Some(c),
            '(' | '[' | '{' => depth = depth.saturating_add(1),
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(open.saturating_add(offset));
                }
            },
            _ => {},
        }
    }
    return None;
}

/// Non-placeholder model ids named in `text`, in order, without repeats.
fn models_in(text: &str, context: &ClaimContext<'_>) -> Vec<String> {
    let mut models: Vec<String> = Vec::new();
    for cap in MODEL_VALUE.captures_iter(text) {
        let Some(value) = cap.get(1).map(|m| return m.as_str()) else {
            continue;
        };
        if context.is_placeholder(value) || models.iter().any(|m| return m == value) {
            continue;
        }
        models.push(value.to_string());
    }
    return models;
}

/// Read method, URL, bodies and form fields from curl's arguments.
fn parse_curl(words: &[(usize, String)]) -> Option<CurlRequest> {
    let position = words.iter().position(|(_, w)| return w == "curl" || w == "curl.exe" || w.ends_with("/curl"))?;
    let (start, _) = words.get(position)?;
    let mut request = CurlRequest { start: *start, ..CurlRequest::default() };
    let mut explicit_method: Option<String> = None;
    let mut get = false;
    let mut url: Option<String> = None;

    let mut args = words.iter().skip(position.saturating_add(1)).map(|(_, w)| return w.as_str());
    while let Some(word) = args.next() {
        let (flag, inline) = match word.split_once('=') {
            Some((flag, value)) if word.starts_with("--") => (flag, Some(value.to_string())),
            _ => (word, None),
        };
        let mut value = || return inline.clone().or_else(|| return args.next().map(str::to_string));

        match flag {
            "-X" | "--request" => explicit_method = value(),
            "-d" | "--data" | "--data-ascii" | "--data-binary" | "--data-raw" | "--data-urlencode" | "--json" => {
                if let Some(body) = value() {
                    request.bodies.push(body);
                }
            },
            "-F" | "--form" | "--form-string" => {
                if let Some(field) = value()
                    && let Some((name, _)) = field.split_once('=')
                {
                    request.form_fields.push(name.to_string());
                }
            },
            "-G" | "--get" => get = true,
            "--url" => url = value(),
            f if CURL_VALUE_FLAGS.contains(&f) => {
                let _ = value();
            },
            f if f.starts_with("-X") && f.len() > 2 => explicit_method = f.get(2..).map(str::to_string),
            f if f.starts_with("-d") && f.len() > 2 && !f.starts_with("--") => {
                request.bodies.push(f.get(2..).unwrap_or("").to_string());
            },
            f if f.starts_with('-') => {},
            _ => {
                if url.is_none() {
                    url = Some(word.to_string());
                }
            },
        }
    }

    request.url = url?;
    request.method = match explicit_method {
        Some(method) => method.to_ascii_uppercase(),
        None if get => "GET".to_string(),
        None if !request.bodies.is_empty() || !request.form_fields.is_empty() => "POST".to_string(),
        None => "GET".to_string(),
    };
    if get {
        let query_keys: Vec<String> = request.bodies.iter().flat_map(|b| return body_keys(b)).collect();
        request.form_fields.extend(query_keys);
        request.bodies.clear();
    }
    return Some(request);
}

/// Keys of a payload that is either an inline object literal or a variable
/// assigned an object literal elsewhere in the block.
fn payload_keys(text: &str, span: &str, value: regex::Match<'_>) -> Vec<String> {
    if value.as_str() == "{" {
        return top_level_keys(span, value.start(), ':');
    }
    return assigned_object_keys(text, value.as_str());
}

/// Names in an `a=1&b=2` string.
fn query_keys(query: &str) -> Vec<String> {
    return query
        .split('&')
        .map(|pair| return pair.split('=').next().unwrap_or("").trim())
        .filter(|key| return !key.is_empty())
        .map(str::to_string)
        .collect();
}

/// `POST /v1/x` request lines with an optional header block and JSON body.
fn request_line_claims(
    slug: &str,
    block: &CodeBlock,
    context: &ClaimContext<'_>,
    claims: &mut Vec<EndpointClaim>,
) {
    let lines: Vec<regex::Captures<'_>> = REQUEST_LINE.captures_iter(&block.text).collect();
    for (index, cap) in lines.iter().enumerate() {
        let (Some(whole), Some(method), Some(target)) = (cap.get(0), cap.get(1), cap.get(2)) else {
            continue;
        };
        if !target.as_str().starts_with('/') && !target.as_str().contains("://") {
            continue;
        }
        let Some(parts) = split_url(target.as_str()) else {
            continue;
        };

        let end = lines
            .get(index.saturating_add(1))
            .and_then(|next| return next.get(0))
            .map_or(block.text.len(), |m| return m.start());
        let message = block.text.get(whole.end()..end).unwrap_or("");
        let body = message
            .split_once("\n\n")
            .or_else(|| return message.split_once("\r\n\r\n"))
            .map_or("", |(_, body)| return body);

        let mut parameters = parts.query;
        parameters.extend(body_keys(body));
        claims.push(EndpointClaim {
            confident: true,
            line: block.line_of(whole.start()),
            method: method.as_str().to_string(),
            models: models_in(body, context),
            parameters,
            path: parts.path,
            slug: slug.to_string(),
            source: ClaimSource::RequestLine,
        });
    }
}

/// Configured SDK calls such as `client.chat.completions.create(...)`.
/// Longer call names win where one is a suffix of another.
fn sdk_claims(slug: &str, block: &CodeBlock, context: &ClaimContext<'_>, claims: &mut Vec<EndpointClaim>) {
    let mut calls: Vec<&SdkCall> = context.sdk_calls.iter().collect();
    calls.sort_by_key(|c| return std::cmp::Reverse(c.call.len()));
    let mut taken: Vec<(usize, usize)> = Vec::new();

    for call in calls {
        for (start, _) in block.text.match_indices(call.call.as_str()) {
            let end = start.saturating_add(call.call.len());
            if taken.iter().any(|(s, e)| return start < *e && end > *s) {
                continue;
            }
            let preceded_ok = block
                .text
                .get(..start)
                .and_then(|before| return before.chars().next_back())
                .is_none_or(|c| return c == '.' || !(c.is_alphanumeric() || c == '_'));
            let after = block.text.get(end..).unwrap_or("");
            let open_offset = after.len().saturating_sub(after.trim_start().len());
            if !preceded_ok || !after.trim_start().starts_with('(') {
                continue;
            }
            taken.push((start, end));

            let open = end.saturating_add(open_offset);
            let span = call_span(&block.text, open).unwrap_or("");
            let inner = span.get(1..).unwrap_or("").trim_start();
            let parameters = if inner.starts_with('{') {
                let object = span.len().saturating_sub(span.get(1..).unwrap_or("").trim_start().len());
                top_level_keys(span, object, ':')
            } else {
                top_level_keys(span, 0, '=')
                    .into_iter()
                    .filter(|k| return !SDK_TRANSPORT_KWARGS.contains(&k.as_str()))
                    .collect()
            };

            claims.push(EndpointClaim {
                confident: true,
                line: block.line_of(start),
                method: call.method.to_ascii_uppercase(),
                models: models_in(span, context),
                parameters,
                path: call.path.clone(),
                slug: slug.to_string(),
                source: ClaimSource::Sdk { call: call.call.clone() },
            });
        }
    }
}

/// Byte offset of an object literal passed as the second positional argument.
fn second_argument_object(span: &str) -> Option<usize> {
    let mut depth = 0_usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut after_comma = false;

    for (offset, c) in span.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' | '`' => quote = Some(c),
            '{' if depth == 1 && after_comma => return Some(offset),
            '(' | '[' | '{' => depth = depth.saturating_add(1),
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 1 => {
                if after_comma {
                    return None;
                }
                after_comma = true;
            },
            c if c.is_whitespace() => {},
            _ if depth == 1 && after_comma => return None,
            _ => {},
        }
    }
    return None;
}

/// Split text into shell commands: words grouped between newlines, `;`, `|`
/// and `&`. Quoting and backslash line continuations follow POSIX shells.
fn shell_commands(text: &str) -> Vec<Vec<(usize, String)>> {
    let mut commands = Vec::new();
    let mut current = Vec::new();
    for token in shell_tokens(text) {
        match token {
            ShellToken::Separator => {
                if !current.is_empty() {
                    commands.push(std::mem::take(&mut current));
                }
            },
            ShellToken::Word { start, text: word } => current.push((start, word)),
        }
    }
    if !current.is_empty() {
        commands.push(current);
    }
    return commands;
}

/// Tokenize shell text.
fn shell_tokens(text: &str) -> Vec<ShellToken> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut start: Option<usize> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((index, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, '\n')) => flush_word(&mut tokens, &mut word, &mut start),
                Some((_, '\r')) => {
                    if chars.peek().is_some_and(|(_, n)| return *n == '\n') {
                        chars.next();
                    }
                    flush_word(&mut tokens, &mut word, &mut start);
                },
                Some((_, other)) => {
                    start.get_or_insert(index);
                    word.push(other);
                },
                None => {},
            },
            '\'' => {
                start.get_or_insert(index);
                for (_, q) in chars.by_ref() {
                    if q == '\'' {
                        break;
                    }
                    word.push(q);
                }
            },
            '"' => {
                start.get_or_insert(index);
                while let Some((_, q)) = chars.next() {
                    match q {
                        '"' => break,
                        '\\' => {
                            if let Some((_, escaped)) = chars.next() {
                                if !matches!(escaped, '"' | '\\' | '$' | '`' | '\n') {
                                    word.push('\\');
                                }
                                if escaped != '\n' {
                                    word.push(escaped);
                                }
                            }
                        },
                        _ => word.push(q),
                    }
                }
            },
            '#' if start.is_none() => {
                for (_, skipped) in chars.by_ref() {
                    if skipped == '\n' {
                        break;
                    }
                }
                tokens.push(ShellToken::Separator);
            },
            '\n' | ';' | '|' | '&' => {
                flush_word(&mut tokens, &mut word, &mut start);
                tokens.push(ShellToken::Separator);
            },
            c if c.is_whitespace() => flush_word(&mut tokens, &mut word, &mut start),
            _ => {
                start.get_or_insert(index);
                word.push(c);
            },
        }
    }
    flush_word(&mut tokens, &mut word, &mut start);
    return tokens;
}

/// Emit the word being built, if any.
fn flush_word(tokens: &mut Vec<ShellToken>, word: &mut String, start: &mut Option<usize>) {
    if let Some(at) = start.take() {
        tokens.push(ShellToken::Word { start: at, text: std::mem::take(word) });
    }
}

/// Host of a URL, without credentials or port.
pub fn host_of(url: &str) -> Option<String> {
    return split_url(url)?.host;
}

/// Split a URL, absolute path or `$VAR/path` expression.
fn split_url(raw: &str) -> Option<UrlParts> {
    let url = raw.trim().trim_matches(['"', '\'']);
    let (host, path, variable_base) = if let Some((_, rest)) = url.split_once("://") {
        let cut = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        let host = rest.get(..cut).unwrap_or("");
        let variable = host.contains(['$', '{', '<']);
        (Some(host.to_string()), rest.get(cut..).unwrap_or(""), variable)
    } else if url.starts_with(['$', '{', '<']) {
        (None, url.get(url.find('/')?..).unwrap_or(""), true)
    } else if url.starts_with('/') {
        (None, url, false)
    } else {
        let slash = url.find('/')?;
        let host = url.get(..slash).unwrap_or("");
        if !host.contains(['.', ':']) || host.contains(char::is_whitespace) {
            return None;
        }
        (Some(host.to_string()), url.get(slash..).unwrap_or(""), false)
    };

    let without_fragment = path.split('#').next().unwrap_or("");
    let (path, query) = without_fragment.split_once('?').unwrap_or((without_fragment, ""));
    let path = if path.is_empty() { "/" } else { path };
    let query = query_keys(query);

    let host = host.map(|h| {
        let without_credentials = h.rsplit('@').next().unwrap_or(&h);
        return without_credentials.split(':').next().unwrap_or(without_credentials).to_string();
    });
    return Some(UrlParts { host, path: path.to_string(), query, variable_base });
}

/// Keys at the top level of the bracketed expression opening at `open`:
/// object keys when `separator` is `:`, keyword arguments when it is `=`.
/// Strings, nested brackets and line comments are skipped.
fn top_level_keys(text: &str, open: usize, separator: char) -> Vec<String> {
    let Some(rest) = text.get(open..) else {
        return Vec::new();
    };
    let mut keys = Vec::new();
    let mut depth = 0_usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut expecting_key = true;
    let mut token = String::new();
    let mut quoted_key: Option<String> = None;
    let mut chars = rest.chars().peekable();

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
                continue;
            } else if c == q {
                quote = None;
                continue;
            }
            if depth == 1
                && let Some(key) = quoted_key.as_mut()
            {
                key.push(c);
            }
            continue;
        }

        match c {
            '"' | '\'' | '`' => {
                quote = Some(c);
                if depth == 1 && expecting_key && token.is_empty() && quoted_key.is_none() {
                    quoted_key = Some(String::new());
                } else if depth == 1 {
                    expecting_key = false;
                }
            },
            '#' => skip_line(&mut chars),
            '/' if chars.peek() == Some(&'/') => skip_line(&mut chars),
            '(' | '[' | '{' => {
                depth = depth.saturating_add(1);
                if depth > 1 {
                    expecting_key = false;
                }
            },
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    break;
                }
            },
            ',' if depth == 1 => {
                expecting_key = true;
                token.clear();
                quoted_key = None;
            },
            c if depth == 1 && expecting_key && c == separator => {
                if separator == '=' && chars.peek() == Some(&'=') {
                    expecting_key = false;
                    continue;
                }
                let key = quoted_key.take().unwrap_or_else(|| return std::mem::take(&mut token));
                if !key.is_empty() {
                    keys.push(key);
                }
                token.clear();
                expecting_key = false;
            },
            c if depth == 1 && expecting_key && (c.is_alphanumeric() || c == '_' || c == '$') => {
                if quoted_key.is_some() {
                    expecting_key = false;
                } else {
                    token.push(c);
                }
            },
            c if c.is_whitespace() => {},
            _ if depth == 1 => expecting_key = false,
            _ => {},
        }
    }

    return keys;
}

/// Consume up to and including the next newline.
fn skip_line(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    for c in chars.by_ref() {
        if c == '\n' {
            break;
        }
    }
}
