use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{redirect, Client, Url};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::errors::{Result, DailyLogError};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.6778.108 Safari/537.36";
const ACCEPT_JSON: &str = "application/json, text/javascript, */*; q=0.1";

/// Raw upstream answer, before the session decides what it means.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub location: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

impl RawResponse {
    pub fn is_redirect(&self) -> bool {
        matches!(self.status, 301 | 302 | 303 | 307 | 308)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn is_json(&self) -> bool {
        match self.content_type.as_deref() {
            Some(ct) => ct.contains("json") || ct.contains("javascript"),
            // 沒有 Content-Type 時看內容是否像 JSON
            None => matches!(self.body.trim_start().chars().next(), Some('{') | Some('[')),
        }
    }
}

/// HTTP seam: one cookie-carrying connection to a single exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    /// 造訪種子頁面取得 cookie
    async fn establish(&self, seed_url: &str) -> Result<()>;

    /// GET without following redirects.
    async fn get(&self, url: &str, referer: &str) -> Result<RawResponse>;

    /// 丟棄 cookie，換成全新的連線
    fn reset(&self) -> Result<()>;
}

/// reqwest 實作，每個交易所各自一份 cookie jar
pub struct HttpTransport {
    client: Mutex<Client>,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: Mutex::new(Self::build_client(timeout)?),
            timeout,
        })
    }

    fn build_client(timeout: Duration) -> Result<Client> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("zh-TW,zh;q=0.9,en;q=0.8"));
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(8))
            .cookie_store(true)
            .redirect(redirect::Policy::none())
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(DailyLogError::RequestError)?;
        Ok(client)
    }

    fn client(&self) -> Client {
        match self.client.lock() {
            Ok(client) => client.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn establish(&self, seed_url: &str) -> Result<()> {
        let response = self.client().get(seed_url).send().await?;
        debug!("Seed {} answered {}", seed_url, response.status());
        Ok(())
    }

    async fn get(&self, url: &str, referer: &str) -> Result<RawResponse> {
        let response = self
            .client()
            .get(url)
            .header(header::ACCEPT, ACCEPT_JSON)
            .header(header::REFERER, referer)
            .header("X-Requested-With", "XMLHttpRequest")
            .send()
            .await?;

        let status = response.status().as_u16();
        let header_text = |name: header::HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let location = header_text(header::LOCATION);
        let content_type = header_text(header::CONTENT_TYPE);
        let body = response.text().await?;

        Ok(RawResponse { status, location, content_type, body })
    }

    fn reset(&self) -> Result<()> {
        let fresh = Self::build_client(self.timeout)?;
        match self.client.lock() {
            Ok(mut client) => *client = fresh,
            Err(poisoned) => *poisoned.into_inner() = fresh,
        }
        Ok(())
    }
}

enum Attempt {
    Payload(Value),
    Rejected(String),
}

/// Cookie/referer session against one exchange, with the single
/// session-renewal retry and request spacing.
pub struct Session {
    transport: Arc<dyn Transport>,
    seed_url: String,
    established: Mutex<bool>,
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl Session {
    pub fn new(transport: Arc<dyn Transport>, seed_url: &str, min_interval: Duration) -> Self {
        Self {
            transport,
            seed_url: seed_url.to_string(),
            established: Mutex::new(false),
            last_request: Mutex::new(None),
            min_interval,
        }
    }

    pub fn seed_url(&self) -> &str {
        &self.seed_url
    }

    /// GET a JSON document. A rejected attempt renews the session and is
    /// retried exactly once; a second rejection is an error.
    pub async fn get_json(&self, url: &str, referer: &str) -> Result<Value> {
        self.ensure_established().await;

        let reason = match self.attempt(url, referer).await? {
            Attempt::Payload(value) => return Ok(value),
            Attempt::Rejected(reason) => reason,
        };

        warn!("{} rejected ({}), renewing session and retrying once", url, reason);
        self.renew().await?;

        match self.attempt(url, referer).await? {
            Attempt::Payload(value) => Ok(value),
            Attempt::Rejected(reason) => Err(DailyLogError::AccessRejected {
                url: url.to_string(),
                reason,
            }),
        }
    }

    async fn ensure_established(&self) {
        let needed = match self.established.lock() {
            Ok(mut flag) => !std::mem::replace(&mut *flag, true),
            Err(_) => false,
        };
        if needed {
            self.seed().await;
        }
    }

    // 種子頁面失敗不影響流程，真正的請求會再判斷
    async fn seed(&self) {
        self.wait_for_rate_limit().await;
        info!("Establishing session via {}", self.seed_url);
        if let Err(e) = self.transport.establish(&self.seed_url).await {
            warn!("Seed request to {} failed: {}", self.seed_url, e);
        }
    }

    async fn renew(&self) -> Result<()> {
        self.transport.reset()?;
        self.seed().await;
        Ok(())
    }

    async fn attempt(&self, url: &str, referer: &str) -> Result<Attempt> {
        self.wait_for_rate_limit().await;
        let mut response = self.transport.get(url, referer).await?;

        if response.is_redirect() {
            let Some(location) = response.location.clone() else {
                return Ok(Attempt::Rejected(format!("HTTP {} without Location", response.status)));
            };
            let target = resolve_location(url, &location)?;
            debug!("{} redirected to {}", url, target);
            self.wait_for_rate_limit().await;
            response = self.transport.get(&target, referer).await?;
        }

        classify(url, response)
    }

    /// 等待請求頻率限制
    async fn wait_for_rate_limit(&self) {
        let now = Instant::now();
        let should_wait = {
            let mut last = match self.last_request.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let should_wait = match *last {
                Some(instant) => {
                    let elapsed = instant.elapsed();
                    if elapsed < self.min_interval {
                        Some(self.min_interval - elapsed)
                    } else {
                        None
                    }
                }
                None => None,
            };
            *last = Some(now);
            should_wait
        };

        if let Some(wait_time) = should_wait {
            debug!("Waiting {:?} between requests", wait_time);
            tokio::time::sleep(wait_time).await;
        }
    }
}

fn resolve_location(base: &str, location: &str) -> Result<String> {
    let base = Url::parse(base)
        .map_err(|e| DailyLogError::MalformedResponse(format!("bad request url {}: {}", base, e)))?;
    base.join(location)
        .map(|u| u.to_string())
        .map_err(|e| DailyLogError::MalformedResponse(format!("bad redirect target {}: {}", location, e)))
}

fn classify(url: &str, response: RawResponse) -> Result<Attempt> {
    if response.is_redirect() {
        return Ok(Attempt::Rejected(format!("redirected again (HTTP {})", response.status)));
    }

    match response.status {
        401 | 403 | 429 => {
            return Ok(Attempt::Rejected(format!("HTTP {}", response.status)));
        }
        _ if !response.is_success() => {
            return Err(DailyLogError::UpstreamStatus { status: response.status, url: url.to_string() });
        }
        _ => {}
    }

    if !response.is_json() {
        return Ok(Attempt::Rejected(format!(
            "non-JSON body ({})",
            response.content_type.as_deref().unwrap_or("no content type")
        )));
    }

    let value: Value = serde_json::from_str(&response.body)?;
    Ok(Attempt::Payload(value))
}
