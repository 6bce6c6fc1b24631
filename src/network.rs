//! Optional network checks: external link liveness, the live models list,
//! and the health endpoint. Every failure becomes a warning; nothing here can
//! fail the run or outlive its deadline.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::config::NetworkSettings;
use crate::contract::{self, ModelInfo};
use crate::error::NetworkError;
use crate::types::{Finding, Location, Rule};

/// Runtime worker threads; the work is I/O bound.
const WORKER_THREADS: usize = 2;

/// What the network checks produced.
#[derive(Debug, Default)]
pub struct NetworkOutcome {
    /// Warnings for unreachable links and endpoints.
    pub findings: Vec<Finding>,
    /// Live models list, when fetched.
    pub models: Option<BTreeMap<String, ModelInfo>>,
}

/// Build the shared client with the per-request timeout.
fn build_client(settings: &NetworkSettings) -> Result<reqwest::Client, NetworkError> {
    return reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .user_agent(concat!("docdrift/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| return NetworkError::Client { reason: e.to_string() });
}

/// Check every external link under a shared concurrency limit. Links still
/// pending at the deadline are aborted and reported as timeouts.
async fn check_links(
    client: &reqwest::Client,
    links: BTreeMap<String, Vec<Location>>,
    concurrency: usize,
    deadline: Instant,
) -> Vec<Finding> {
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut tasks = JoinSet::new();
    let mut pending: BTreeMap<String, Vec<Location>> = BTreeMap::new();

    for (url, locations) in links {
        let client = client.clone();
        let semaphore = Arc::clone(&semaphore);
        let target = url.clone();
        tasks.spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return (target, Ok(()));
            };
            let url = target.clone();
            let result = settle(&target, async move { return probe(&client, &url).await }).await;
            return (target, result);
        });
        pending.insert(url, locations);
    }

    let mut findings = Vec::new();
    loop {
        match tokio::time::timeout_at(deadline, tasks.join_next()).await {
            Ok(Some(Ok((url, result)))) => {
                let Some(locations) = pending.remove(&url) else {
                    continue;
                };
                if let Err(e) = result {
                    tracing::warn!(%url, error = %e, "external link unreachable");
                    findings.extend(unreachable(&e, &locations));
                }
            },
            Ok(Some(Err(e))) => tracing::warn!(error = %e, "link check task failed"),
            Ok(None) => break,
            Err(_) => {
                tracing::warn!(pending = pending.len(), "network deadline reached; aborting link checks");
                tasks.abort_all();
                break;
            },
        }
    }

    for (url, locations) in pending {
        findings.extend(unreachable(&NetworkError::Timeout { url }, &locations));
    }
    return findings;
}

/// Fetch and parse the models list, with a bearer token when one is set.
async fn fetch_models(
    client: &reqwest::Client,
    url: &str,
    token: Option<&str>,
) -> Result<BTreeMap<String, ModelInfo>, NetworkError> {
    let mut request = client.get(url);
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    let response = request.send().await.map_err(|e| return transport_error(url, &e))?;
    let status = response.status();
    if !status.is_success() {
        return Err(NetworkError::Status { status: status.as_u16(), url: url.to_string() });
    }
    let body = response.text().await.map_err(|e| return transport_error(url, &e))?;
    return contract::parse_models(&body)
        .map_err(|e| return NetworkError::InvalidBody { reason: e.to_string(), url: url.to_string() });
}

/// The health endpoint must answer 2xx.
async fn health(client: &reqwest::Client, url: &str) -> Result<(), NetworkError> {
    let response = client.get(url).send().await.map_err(|e| return transport_error(url, &e))?;
    let status = response.status();
    if !status.is_success() {
        return Err(NetworkError::Status { status: status.as_u16(), url: url.to_string() });
    }
    return Ok(());
}

/// One introspection warning.
fn introspection_warning(what: &str, error: &NetworkError) -> Finding {
    tracing::warn!(%what, error = %error, "introspection failed");
    return Finding::new(Rule::IntrospectionUnavailable, Location::run(), format!("{what}: {error}"));
}

/// HEAD the URL, falling back to GET for servers that refuse HEAD.
/// Success and redirect statuses pass.
async fn probe(client: &reqwest::Client, url: &str) -> Result<(), NetworkError> {
    let mut response = client.head(url).send().await.map_err(|e| return transport_error(url, &e))?;
    if matches!(response.status(), StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED) {
        response = client.get(url).send().await.map_err(|e| return transport_error(url, &e))?;
    }
    let status = response.status();
    if status.is_success() || status.is_redirection() {
        return Ok(());
    }
    return Err(NetworkError::Status { status: status.as_u16(), url: url.to_string() });
}

/// Run one check on its own task so a panic inside it becomes an error for
/// that URL instead of an unattributed join failure.
async fn settle<F>(url: &str, check: F) -> Result<(), NetworkError>
where
    F: Future<Output = Result<(), NetworkError>> + Send + 'static,
{
    return tokio::spawn(check).await.unwrap_or_else(|e| {
        return Err(NetworkError::TaskFailed { reason: e.to_string(), url: url.to_string() });
    });
}

/// Run every enabled network check on a private runtime and block until
/// they finish or the deadline passes.
pub fn run(settings: &NetworkSettings, links: BTreeMap<String, Vec<Location>>) -> NetworkOutcome {
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(WORKER_THREADS)
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            let error = NetworkError::Client { reason: e.to_string() };
            return NetworkOutcome {
                findings: vec![introspection_warning("network checks skipped", &error)],
                models: None,
            };
        },
    };
    return runtime.block_on(run_async(settings, links));
}

/// Async body of [`run`].
async fn run_async(settings: &NetworkSettings, links: BTreeMap<String, Vec<Location>>) -> NetworkOutcome {
    let client = match build_client(settings) {
        Ok(client) => client,
        Err(e) => {
            return NetworkOutcome {
                findings: vec![introspection_warning("network checks skipped", &e)],
                models: None,
            };
        },
    };
    let now = Instant::now();
    let deadline = now.checked_add(Duration::from_secs(settings.deadline_secs)).unwrap_or(now);
    let token = settings.api_key_env.as_deref().and_then(|var| return std::env::var(var).ok());
    tracing::info!(links = links.len(), concurrency = settings.concurrency, "starting network checks");

    let models_check = async {
        let url = settings.models_url.as_deref()?;
        let fetched = tokio::time::timeout_at(deadline, fetch_models(&client, url, token.as_deref()))
            .await
            .unwrap_or_else(|_| return Err(NetworkError::Timeout { url: url.to_string() }));
        return Some((url, fetched));
    };
    let health_check = async {
        let url = settings.health_url.as_deref()?;
        let checked = tokio::time::timeout_at(deadline, health(&client, url))
            .await
            .unwrap_or_else(|_| return Err(NetworkError::Timeout { url: url.to_string() }));
        return Some((url, checked));
    };
    let link_check = check_links(&client, links, settings.concurrency, deadline);
    let (models, health_result, mut findings) = tokio::join!(models_check, health_check, link_check);

    let mut outcome = NetworkOutcome::default();
    match models {
        Some((_, Ok(list))) => {
            tracing::info!(models = list.len(), "fetched live models list");
            outcome.models = Some(list);
        },
        Some((url, Err(e))) => findings.push(introspection_warning(&format!("models list `{url}`"), &e)),
        None => {},
    }
    if let Some((url, Err(e))) = health_result {
        findings.push(introspection_warning(&format!("health check `{url}`"), &e));
    }
    outcome.findings = findings;
    return outcome;
}

/// Map a reqwest error onto the network taxonomy.
fn transport_error(url: &str, error: &reqwest::Error) -> NetworkError {
    if error.is_timeout() {
        return NetworkError::Timeout { url: url.to_string() };
    }
    return NetworkError::Connect { reason: error.to_string(), url: url.to_string() };
}

/// One warning per place the link appears.
fn unreachable(error: &NetworkError, locations: &[Location]) -> Vec<Finding> {
    return locations
        .iter()
        .map(|location| {
            return Finding::new(
                Rule::ExternalLinkUnreachable,
                location.clone(),
                format!("external link check failed: {error}"),
            );
        })
        .collect();
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;

    use super::*;
    use crate::types::Severity;

    /// Serve one canned response per connection, in order.
    fn serve(responses: Vec<(&'static str, &'static str)>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            for (status, body) in responses {
                let Ok((mut stream, _)) = listener.accept() else {
                    return;
                };
                let mut buf = [0_u8; 4096];
                let _ = stream.read(&mut buf);
                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });
        return format!("http://{addr}");
    }

    /// A local port nothing listens on.
    fn closed_port() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        return format!("http://{addr}/gone");
    }

    fn settings() -> NetworkSettings {
        return NetworkSettings {
            api_key_env: None,
            concurrency: 2,
            deadline_secs: 10,
            enabled: true,
            health_url: None,
            models_url: None,
            timeout_secs: 2,
        };
    }

    fn links(urls: &[&str]) -> BTreeMap<String, Vec<Location>> {
        return urls.iter().map(|u| return ((*u).to_string(), vec![Location::at("guide", 3)])).collect();
    }

    async fn exploding_check() -> Result<(), NetworkError> {
        panic!("check blew up");
    }

    #[test]
    fn panicking_check_is_attributed_to_its_url() {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let result = runtime.block_on(settle("https://example.com/x", exploding_check()));
        let Err(NetworkError::TaskFailed { url, .. }) = result else {
            panic!("expected a task failure, got {result:?}");
        };
        assert_eq!(url, "https://example.com/x");

        let fine = runtime.block_on(settle("https://example.com/y", async { return Ok::<(), NetworkError>(()) }));
        assert!(fine.is_ok());
    }

    #[test]
    fn failures_are_warnings_successes_are_silent() {
        let ok = serve(vec![("200 OK", "")]);
        let missing = serve(vec![("404 Not Found", "")]);
        let outcome = run(&settings(), links(&[&ok, &missing, &closed_port()]));
        assert_eq!(outcome.findings.len(), 2);
        assert!(outcome.findings.iter().all(|f| return f.rule == Rule::ExternalLinkUnreachable));
        assert!(outcome.findings.iter().all(|f| return f.severity == Severity::Warning));
        assert!(outcome.findings.iter().any(|f| return f.message.contains("404")));
    }

    #[test]
    fn head_refused_falls_back_to_get() {
        let url = serve(vec![("405 Method Not Allowed", ""), ("200 OK", "")]);
        assert!(run(&settings(), links(&[&url])).findings.is_empty());
    }

    #[test]
    fn models_list_fetched() {
        let url = serve(vec![("200 OK", r#"{"data": [{"id": "llama-3-8b", "max_model_len": 8192}]}"#)]);
        let mut settings = settings();
        settings.models_url = Some(format!("{url}/v1/models"));
        let outcome = run(&settings, BTreeMap::new());
        assert!(outcome.findings.is_empty());
        let models = outcome.models.unwrap();
        assert_eq!(models["llama-3-8b"].context_length, Some(8192));
    }

    #[test]
    fn failed_health_check_is_introspection_warning() {
        let url = serve(vec![("503 Service Unavailable", "")]);
        let mut settings = settings();
        settings.health_url = Some(format!("{url}/health"));
        let outcome = run(&settings, BTreeMap::new());
        assert_eq!(outcome.findings.len(), 1);
        assert_eq!(outcome.findings[0].rule, Rule::IntrospectionUnavailable);
        assert!(outcome.models.is_none());
    }

    #[test]
    fn deadline_turns_hung_requests_into_timeouts() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let held: Vec<_> = listener.incoming().take(1).collect();
            std::thread::sleep(Duration::from_secs(5));
            drop(held);
        });
        let mut settings = settings();
        settings.deadline_secs = 1;
        settings.timeout_secs = 30;
        let outcome = run(&settings, links(&[&format!("http://{addr}/slow")]));
        assert_eq!(outcome.findings.len(), 1);
        assert!(outcome.findings[0].message.contains("timed out"));
    }
}
