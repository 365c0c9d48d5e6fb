use async_trait::async_trait;
use reqwest::{redirect, tls, Client};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::FetchConfig;
use crate::error::{ConfigError, FetchError};

const MAX_REDIRECTS: usize = 10;

const USER_AGENT: &str = concat!(
    "go-license-checkr/",
    env!("CARGO_PKG_VERSION"),
    " (license compliance tool)"
);

/// A fully read HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Issues the single GET a lookup needs.
///
/// Implementations must honour `cancel` for the whole exchange, body read
/// included, and report it as [`FetchError::Cancelled`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str, cancel: &CancellationToken) -> Result<Response, FetchError>;
}

/// [`Transport`] over a reqwest client pinned to the lookup host.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    host: String,
}

impl HttpTransport {
    pub fn new(config: &FetchConfig) -> Result<Self, ConfigError> {
        let base = Url::parse(&config.base_url).map_err(|source| ConfigError::BaseUrl {
            url: config.base_url.clone(),
            source,
        })?;
        let host = base
            .host_str()
            .ok_or_else(|| ConfigError::MissingHost(config.base_url.clone()))?
            .to_string();

        if config.timeout_secs == 0 {
            return Err(ConfigError::Zero("timeout_secs"));
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .min_tls_version(tls::Version::TLS_1_3)
            .https_only(base.scheme() == "https")
            .timeout(config.timeout())
            .redirect(pinned_redirects(host.clone()))
            .build()?;

        Ok(Self { client, host })
    }

    fn pinned(&self, url: &str) -> Result<Url, FetchError> {
        let target = Url::parse(url).map_err(|e| FetchError::InvalidTarget(e.to_string()))?;
        match target.host_str() {
            Some(host) if host == self.host => Ok(target),
            other => Err(FetchError::InvalidTarget(format!(
                "host {} is not the lookup host {}",
                other.unwrap_or("<none>"),
                self.host
            ))),
        }
    }
}

/// Follow redirects only while they stay on `host`.
fn pinned_redirects(host: String) -> redirect::Policy {
    redirect::Policy::custom(move |attempt| {
        let target = attempt.url().host_str().map(str::to_owned);
        if target.as_deref() != Some(host.as_str()) {
            let message = format!(
                "redirect to {} leaves the lookup host {}",
                target.as_deref().unwrap_or("<none>"),
                host
            );
            attempt.error(message)
        } else if attempt.previous().len() >= MAX_REDIRECTS {
            attempt.error("too many redirects")
        } else {
            attempt.follow()
        }
    })
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str, cancel: &CancellationToken) -> Result<Response, FetchError> {
        let target = self.pinned(url)?;

        let exchange = async {
            let response = self.client.get(target).send().await?;
            let status = response.status().as_u16();
            let body = response.bytes().await?;
            Ok::<_, FetchError>(Response {
                status,
                body: body.to_vec(),
            })
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            result = exchange => result,
        }
    }
}
