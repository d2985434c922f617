use color_eyre::{eyre::eyre, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::Config;
use crate::error::SyncError;

use super::api_types::ApiAttendanceResponse;
use super::types::AttendanceSnapshot;

/// Query flag asking the proxy to bypass its own caches.
const FORCE_PARAM: &str = "refresh";

/// Where attendance comes from. Read-only: repeating a fetch has no effect
/// beyond its timing.
pub trait AttendanceSource: Clone + Send + Sync + 'static {
  /// Resource locator for a fetch; `force` adds the refresh flag.
  fn locator(&self, force: bool) -> Url;

  /// Fetch the current attendance table.
  fn fetch_attendance(
    &self,
    force: bool,
  ) -> impl Future<Output = Result<AttendanceSnapshot, SyncError>> + Send;
}

/// Portal login
#[derive(Clone)]
pub struct Credentials {
  pub username: String,
  pub password: Option<String>,
}

/// HTTP client for the attendance proxy
#[derive(Clone)]
pub struct PortalClient {
  http: reqwest::Client,
  url: Url,
  credentials: Credentials,
}

impl PortalClient {
  pub fn new(config: &Config) -> Result<Self> {
    let url = Url::parse(&config.portal.url)
      .map_err(|e| eyre!("Invalid portal url {}: {}", config.portal.url, e))?;

    let password = Config::get_password();
    if password.is_none() {
      warn!("No portal password in environment, relying on the proxy session");
    }

    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.portal.request_timeout_secs))
      .user_agent(concat!("attendr/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      url,
      credentials: Credentials {
        username: config.portal.username.clone(),
        password,
      },
    })
  }

  /// Portal host, for display
  pub fn host(&self) -> &str {
    self.url.host_str().unwrap_or("")
  }
}

impl AttendanceSource for PortalClient {
  fn locator(&self, force: bool) -> Url {
    let mut url = self.url.clone();
    if force {
      url.query_pairs_mut().append_pair(FORCE_PARAM, "1");
    }
    url
  }

  async fn fetch_attendance(&self, force: bool) -> Result<AttendanceSnapshot, SyncError> {
    let url = self.locator(force);
    debug!("Fetching attendance from {}", url);

    let response = self
      .http
      .get(url)
      .basic_auth(&self.credentials.username, self.credentials.password.as_ref())
      .header(reqwest::header::ACCEPT, "application/json")
      .send()
      .await?
      .error_for_status()?;

    let body: ApiAttendanceResponse = response.json().await?;
    let snapshot = body.into_snapshot();

    debug!(
      "Fetched {} records (logged in: {})",
      snapshot.records.len(),
      snapshot.logged_in
    );
    Ok(snapshot)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::CacheKey;
  use crate::config::PortalConfig;

  fn client(url: &str) -> PortalClient {
    let config = Config {
      portal: PortalConfig {
        url: url.to_string(),
        username: "student".to_string(),
        request_timeout_secs: 5,
      },
      ..Config::default()
    };
    PortalClient::new(&config).unwrap()
  }

  #[test]
  fn test_forced_locator_carries_refresh_flag() {
    let client = client("https://proxy.example.edu/api/data");
    assert_eq!(
      client.locator(true).as_str(),
      "https://proxy.example.edu/api/data?refresh=1"
    );
    assert_eq!(
      client.locator(false).as_str(),
      "https://proxy.example.edu/api/data"
    );
  }

  #[test]
  fn test_forced_and_plain_locators_share_cache_key() {
    let client = client("https://proxy.example.edu/api/data?term=2");
    assert_eq!(
      CacheKey::normalize(&client.locator(true)),
      CacheKey::normalize(&client.locator(false))
    );
  }

  #[test]
  fn test_invalid_url_is_rejected() {
    let config = Config {
      portal: PortalConfig {
        url: "not a url".to_string(),
        username: "student".to_string(),
        request_timeout_secs: 5,
      },
      ..Config::default()
    };
    assert!(PortalClient::new(&config).is_err());
  }

  #[test]
  fn test_host_for_display() {
    assert_eq!(
      client("https://proxy.example.edu/api/data").host(),
      "proxy.example.edu"
    );
  }
}
