use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;

use e4l_core::model::{CalculationResult, Questionnaire, SeminarVerdict, Session, SessionId};

use super::QuestionnaireTransport;
use super::wire::{WireSession, parse_session_id};
use crate::error::TransportError;

const DEFAULT_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Where the backend lives and how long to wait for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl ApiConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Reads `E4L_API_URL` and `E4L_API_TIMEOUT_SECS`, falling back to a local backend.
    #[must_use]
    pub fn from_env() -> Self {
        let base_url = env::var("E4L_API_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.into());
        let timeout = env::var("E4L_API_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS), Duration::from_secs);
        Self { base_url, timeout }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// `QuestionnaireTransport` over the backend's REST endpoints.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    /// Build a client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::InvalidUrl` for an unusable base URL and
    /// `TransportError::Http` if the client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, TransportError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|err| TransportError::InvalidUrl(format!("{}: {err}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(TransportError::InvalidUrl(config.base_url.clone()));
        }
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, TransportError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| TransportError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn json<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
        let response = Self::check(response)?;
        Ok(response.json().await?)
    }

    fn check(response: Response) -> Result<Response, TransportError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(TransportError::HttpStatus(response.status()))
        }
    }
}

#[async_trait]
impl QuestionnaireTransport for HttpTransport {
    async fn fetch_questionnaire(&self, kid: bool) -> Result<Questionnaire, TransportError> {
        let mut request = self.client.get(self.endpoint(&["questionnaire"])?);
        if kid {
            request = request.query(&[("kid", "true")]);
        }
        let catalog: Questionnaire = Self::json(request.send().await?).await?;
        tracing::debug!(questions = catalog.len(), kid, "fetched questionnaire");
        Ok(catalog)
    }

    async fn send_session(&self, session: &Session) -> Result<SessionId, TransportError> {
        let url = match session.seminar_access_code.as_deref() {
            Some(code) if !code.trim().is_empty() => self.endpoint(&["session", code.trim()])?,
            _ => self.endpoint(&["session"])?,
        };
        let response = self
            .client
            .post(url)
            .json(&WireSession::from(session))
            .send()
            .await?;
        let body = Self::check(response)?.text().await?;
        parse_session_id(&body)
            .map(SessionId::new)
            .ok_or(TransportError::EmptyResponse)
    }

    async fn compute_energy(&self, session: &Session) -> Result<CalculationResult, TransportError> {
        let response = self
            .client
            .post(self.endpoint(&["calculate", "energyConsumption"])?)
            .json(&WireSession::from(session))
            .send()
            .await?;
        Self::json(response).await
    }

    async fn fetch_result(&self, session_id: &SessionId) -> Result<CalculationResult, TransportError> {
        let response = self
            .client
            .get(self.endpoint(&["calculate", "session", session_id.as_str()])?)
            .send()
            .await?;
        Self::json(response).await
    }

    async fn validate_seminar_code(&self, code: &str) -> Result<SeminarVerdict, TransportError> {
        let response = self
            .client
            .get(self.endpoint(&["seminar", "validate", code.trim()])?)
            .send()
            .await?;
        Self::json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_segments_once() {
        let transport = HttpTransport::new(&ApiConfig::new("http://localhost:8080/api/")).unwrap();
        let url = transport.endpoint(&["calculate", "energyConsumption"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/calculate/energyConsumption");
    }

    #[test]
    fn endpoint_escapes_codes() {
        let transport = HttpTransport::new(&ApiConfig::default()).unwrap();
        let url = transport.endpoint(&["seminar", "validate", "a b/c"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/seminar/validate/a%20b%2Fc");
    }

    #[test]
    fn rejects_unusable_base_url() {
        assert!(matches!(
            HttpTransport::new(&ApiConfig::new("not a url")),
            Err(TransportError::InvalidUrl(_))
        ));
        assert!(matches!(
            HttpTransport::new(&ApiConfig::new("mailto:someone@example.com")),
            Err(TransportError::InvalidUrl(_))
        ));
    }
}
