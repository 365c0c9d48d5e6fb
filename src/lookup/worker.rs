use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::page::extract_license;
use super::transport::Transport;
use crate::error::FetchError;
use crate::models::{LicenseResult, Module};

/// Build the licenses-tab URL for `module` under `base_url`.
pub fn licenses_url(base_url: &str, module: &Module) -> String {
    let mut url = format!("{}/{}", base_url.trim_end_matches('/'), module.path);
    if !module.version.is_empty() {
        url.push('@');
        url.push_str(&module.version);
    }
    url.push_str("?tab=licenses");
    url
}

/// Looks up one module and turns every outcome into a [`LicenseResult`].
#[derive(Clone)]
pub struct Worker {
    transport: Arc<dyn Transport>,
    base_url: String,
    debug: bool,
}

impl Worker {
    pub fn new(transport: Arc<dyn Transport>, base_url: impl Into<String>, debug: bool) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            debug,
        }
    }

    /// Fetch and parse the licenses page. Never fails: errors come back as
    /// [`LicenseResult::Failure`]. Attempted exactly once.
    pub async fn fetch(&self, module: Module, cancel: &CancellationToken) -> LicenseResult {
        let uri = licenses_url(&self.base_url, &module);
        info!("Fetch {}", uri);

        let response = match self.transport.get(&uri, cancel).await {
            Ok(response) => response,
            Err(error) => return LicenseResult::Failure { module, uri, error },
        };

        if self.debug {
            debug!(
                uri = %uri,
                status = response.status,
                bytes = response.body.len(),
                "lookup response"
            );
        }

        if response.status != 200 {
            return LicenseResult::Failure {
                module,
                uri,
                error: FetchError::BadStatus(response.status),
            };
        }

        match extract_license(&response.body) {
            Ok(license) => LicenseResult::Success {
                module,
                uri,
                license,
            },
            Err(e) => LicenseResult::Failure {
                module,
                uri,
                error: e.into(),
            },
        }
    }
}
