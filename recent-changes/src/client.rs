use crate::soap;
use crate::traits::MetadataApi;
use crate::types::{
    ChangesError, ClientConfig, ItemDescriptor, ListQuery, MetadataTypeInfo, OrgConfig, Result,
    UserIdentity, UserRecord,
};
use async_trait::async_trait;
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

/// Metadata API client for one org: SOAP for metadata, REST for identity.
pub struct SalesforceClient {
    client: Client,
    org: OrgConfig,
    config: ClientConfig,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    user_id: String,
    organization_id: Option<String>,
    preferred_username: Option<String>,
}

impl SalesforceClient {
    pub fn new(org: OrgConfig, config: ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()?;

        Ok(Self { client, org, config })
    }

    fn soap_endpoint(&self) -> Result<Url> {
        Ok(self
            .org
            .instance_url
            .join(&format!("services/Soap/m/{}", self.org.api_version))?)
    }

    fn rest_url(&self, path: &str) -> Result<Url> {
        Ok(self.org.instance_url.join(path)?)
    }

    /// Send a request, retrying transport errors and throttling/gateway
    /// statuses with exponential back-off. Any other response is returned as is.
    async fn send_with_retry<F>(&self, describe: &str, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let start_time = Instant::now();
        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: Duration::from_millis(self.config.retry_delay_ms),
            initial_interval: Duration::from_millis(self.config.retry_delay_ms),
            max_interval: Duration::from_millis(self.config.retry_delay_ms * 32),
            multiplier: 2.0,
            max_elapsed_time: Some(Duration::from_millis(self.config.retry_delay_ms * 60)),
            ..Default::default()
        };

        let mut attempt = 0;
        loop {
            let outcome = build().send().await;

            let retryable = match &outcome {
                Ok(response) => is_transient(response.status()),
                Err(e) => e.is_timeout() || e.is_connect(),
            };

            if !retryable || attempt >= self.config.max_retries {
                let response = outcome?;
                debug!(
                    "{} -> {} in {}ms",
                    describe,
                    response.status(),
                    start_time.elapsed().as_millis()
                );
                return Ok(response);
            }

            match backoff.next_backoff() {
                Some(delay) => {
                    warn!("Attempt {} of {} failed, retrying in {:?}", attempt + 1, describe, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => {
                    let response = outcome?;
                    return Ok(response);
                }
            }
        }
    }

    async fn soap_call(&self, action: &str, body: String) -> Result<String> {
        let endpoint = self.soap_endpoint()?;
        let envelope = soap::envelope(&self.org.access_token, &body);

        let response = self
            .send_with_retry(action, || {
                self.client
                    .post(endpoint.clone())
                    .header("Content-Type", "text/xml; charset=UTF-8")
                    .header("SOAPAction", "\"\"")
                    .body(envelope.clone())
            })
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            return Ok(text);
        }
        // Faults arrive with HTTP 500; gateways may answer with HTML instead.
        match soap::check_fault(&text) {
            Err(fault @ ChangesError::Soap { .. }) => Err(fault),
            _ => Err(api_error(status, &text)),
        }
    }

    async fn rest_get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let describe = url.path().to_string();
        let response = self
            .send_with_retry(&describe, || {
                self.client
                    .get(url.clone())
                    .bearer_auth(&self.org.access_token)
                    .header("Accept", "application/json")
            })
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(api_error(status, &text));
        }
        Ok(response.json::<T>().await?)
    }
}

fn is_transient(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::BAD_GATEWAY
        || status == StatusCode::SERVICE_UNAVAILABLE
        || status == StatusCode::GATEWAY_TIMEOUT
}

fn api_error(status: StatusCode, body: &str) -> ChangesError {
    let mut message: String = body.trim().chars().take(300).collect();
    if message.is_empty() {
        message = status.canonical_reason().unwrap_or("Unknown").to_string();
    }
    ChangesError::Api {
        status: status.as_u16(),
        message,
    }
}

/// Salesforce record ids are 15 or 18 alphanumeric characters.
pub fn is_valid_record_id(id: &str) -> bool {
    (id.len() == 15 || id.len() == 18) && id.chars().all(|c| c.is_ascii_alphanumeric())
}

#[async_trait]
impl MetadataApi for SalesforceClient {
    async fn describe_types(&self) -> Result<Vec<MetadataTypeInfo>> {
        let body = soap::describe_metadata_body(&self.org.api_version);
        let xml = self.soap_call("describeMetadata", body).await?;
        soap::parse_describe_metadata(&xml)
    }

    async fn list_items(&self, queries: &[ListQuery]) -> Result<Vec<ItemDescriptor>> {
        if queries.is_empty() {
            return Ok(Vec::new());
        }
        let body = soap::list_metadata_body(queries, &self.org.api_version);
        let xml = self.soap_call("listMetadata", body).await?;
        soap::parse_list_metadata(&xml)
    }

    async fn resolve_identity(&self) -> Result<UserIdentity> {
        let url = self.rest_url("services/oauth2/userinfo")?;
        let info: UserInfoResponse = self.rest_get(url).await?;
        Ok(UserIdentity {
            user_id: info.user_id,
            organization_id: info.organization_id,
            username: info.preferred_username,
        })
    }

    async fn query_display_name(&self, user_id: &str) -> Result<UserRecord> {
        if !is_valid_record_id(user_id) {
            return Err(ChangesError::InvalidUserId(user_id.to_string()));
        }
        let mut url = self.rest_url(&format!(
            "services/data/v{}/sobjects/User/{}",
            self.org.api_version, user_id
        ))?;
        url.query_pairs_mut().append_pair("fields", "Name");
        self.rest_get(url).await
    }

    fn api_version(&self) -> String {
        self.org.api_version.clone()
    }
}
