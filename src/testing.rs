//! In-process doubles for the network-facing collaborators

use crate::crawler::PdfResolver;
use crate::fetch::{Transport, TransportError, TransportRequest, TransportResponse};
use crate::proxy::{CandidateProvider, Prober};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Provider returning the same list on every call
pub struct FixedProvider {
    addresses: Vec<String>,
    calls: AtomicUsize,
}

impl FixedProvider {
    pub fn new(addresses: Vec<String>) -> Self {
        Self {
            addresses,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CandidateProvider for FixedProvider {
    async fn candidates(&self) -> Result<Vec<String>, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.addresses.clone())
    }
}

/// Prober that passes exactly the listed addresses
pub struct ScriptedProber {
    alive: HashSet<String>,
}

impl ScriptedProber {
    pub fn alive(addresses: &[&str]) -> Self {
        Self {
            alive: addresses.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, address: &str) -> Result<Duration, String> {
        if self.alive.contains(address) {
            Ok(Duration::from_millis(50))
        } else {
            Err("connection refused".to_string())
        }
    }
}

/// One request observed by [`ScriptedTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub url: String,
    pub proxy: Option<String>,
}

type Reply = Result<TransportResponse, TransportError>;

/// Transport answering from per-URL queues
///
/// A request matches the longest registered URL prefix. Queued replies are
/// consumed in order and the last one repeats. Unmatched requests fail with
/// `TransportError::Other`.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<RecordedCall>>,
    released: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, url: &str, reply: Reply) -> &Self {
        self.replies
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn html(&self, url: &str, status: u16, body: &str) -> &Self {
        self.push(
            url,
            Ok(TransportResponse {
                status,
                content_type: Some("text/html; charset=UTF-8".to_string()),
                body: body.as_bytes().to_vec(),
            }),
        )
    }

    pub fn pdf(&self, url: &str, body: &[u8]) -> &Self {
        self.push(
            url,
            Ok(TransportResponse {
                status: 200,
                content_type: Some("application/pdf".to_string()),
                body: body.to_vec(),
            }),
        )
    }

    pub fn error(&self, url: &str, error: TransportError) -> &Self {
        self.push(url, Err(error))
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Proxies the orchestrator told the transport to forget
    pub fn released(&self) -> Vec<String> {
        self.released.lock().unwrap().clone()
    }

    /// Number of requests whose URL starts with `prefix`
    pub fn calls_to(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.url.starts_with(prefix))
            .count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, request: &TransportRequest<'_>) -> Result<TransportResponse, TransportError> {
        self.calls.lock().unwrap().push(RecordedCall {
            url: request.url.to_string(),
            proxy: request.proxy.map(str::to_string),
        });

        let mut replies = self.replies.lock().unwrap();
        let key = replies
            .keys()
            .filter(|k| request.url.starts_with(k.as_str()))
            .max_by_key(|k| k.len())
            .cloned();

        let Some(queue) = key.and_then(|k| replies.get_mut(&k)) else {
            return Err(TransportError::Other(format!("no reply for {}", request.url)));
        };

        if queue.len() > 1 {
            queue.pop_front().unwrap_or(Err(TransportError::Other("empty".into())))
        } else {
            queue
                .front()
                .cloned()
                .unwrap_or(Err(TransportError::Other("empty".into())))
        }
    }

    fn release(&self, proxy: &str) {
        self.released.lock().unwrap().push(proxy.to_string());
    }
}

/// Resolver answering from a fixed DOI map
#[derive(Default)]
pub struct StubResolver {
    links: HashMap<String, String>,
}

impl StubResolver {
    pub fn with(doi: &str, url: &str) -> Self {
        let mut links = HashMap::new();
        links.insert(doi.to_string(), url.to_string());
        Self { links }
    }
}

#[async_trait]
impl PdfResolver for StubResolver {
    async fn resolve(&self, doi: &str) -> Option<String> {
        self.links.get(doi).cloned()
    }
}

/// One search hit for [`results_page`]
pub struct Hit<'a> {
    pub title: &'a str,
    pub url: &'a str,
    pub cited_by: Option<&'a str>,
}

/// Renders a minimal search results page
pub fn results_page(hits: &[Hit<'_>], has_next: bool) -> String {
    let mut html = String::from("<html><body><div id=\"gs_res_ccl_mid\">");
    for hit in hits {
        html.push_str("<div class=\"gs_r gs_or gs_scl\"><div class=\"gs_ri\">");
        html.push_str(&format!(
            "<h3 class=\"gs_rt\"><a href=\"{}\">{}</a></h3>",
            hit.url, hit.title
        ));
        html.push_str("<div class=\"gs_a\">A Author, B Author - Journal of Tests, 2021 - example.org</div>");
        html.push_str("<div class=\"gs_rs\">A snippet.</div>");
        html.push_str("<div class=\"gs_fl\">");
        if let Some(cited_by) = hit.cited_by {
            html.push_str(&format!("<a href=\"{}\">Cited by 7</a>", cited_by));
        }
        html.push_str("</div></div></div>");
    }
    html.push_str("</div>");
    if has_next {
        html.push_str(
            "<div id=\"gs_n\"><table><tr><td class=\"gs_n\"><a href=\"/scholar?start=10&q=x\">Next</a></td></tr></table></div>",
        );
    }
    html.push_str("</body></html>");
    html
}
