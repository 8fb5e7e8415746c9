use std::time::Duration;

use async_trait::async_trait;
use opentelemetry::global;
use opentelemetry_http::HeaderInjector;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::types::{
    NotificationMessage, NotificationRecipient, Process, Schedule, ScheduleChange, Shift,
    ShiftChange, TeamMember,
};
use tokio_util::sync::CancellationToken;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use uuid::Uuid;

use crate::config::BackendConfig;
use crate::domain::context::ContextFetcher;
use crate::domain::recipient::{NewRecipient, RecipientStateUpdate, RecipientStore};
use crate::domain::transport::NotificationTransport;
use crate::error::BackendError;
use crate::infrastructure::payload::{BatchStatus, decode, decode_optional};

const BACKOFF_BASE_MS: u64 = 100;
/// Backoff stops growing after 100ms * 2^6 = 6.4s.
const BACKOFF_MAX_EXPONENT: u32 = 6;

/// Delay before retry number `attempt` (1-based).
fn backoff(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(BACKOFF_MAX_EXPONENT);
    Duration::from_millis(BACKOFF_BASE_MS << exponent)
}

/// HTTP collaborator for the shift-management backend.
///
/// Injects the bearer token and W3C trace context on every request. Reads are
/// retried on connection failures with exponential backoff; writes are sent
/// exactly once. Every request stops early when the cancellation token fires.
#[derive(Clone)]
pub struct HttpBackendClient {
    client: Client,
    base_url: String,
    bearer_token: Option<String>,
    max_retries: u32,
    cancel: CancellationToken,
}

/// Wire shape accepted by the batch-send endpoint.
#[derive(Debug, Serialize)]
struct OutgoingMessage<'a> {
    address: &'a str,
    subject: &'a str,
    body_html: &'a str,
    is_automatic: bool,
    related_schedule_id: Option<Uuid>,
}

impl HttpBackendClient {
    /// Builds the client with the configured timeout.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built (invalid TLS configuration).
    pub fn new(config: &BackendConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bearer_token: config.bearer_token.clone(),
            max_retries: config.max_retries.max(1),
            cancel: CancellationToken::new(),
        }
    }

    /// Ties every request of this client to `cancel`.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{path}", self.base_url);

        let mut headers = header::HeaderMap::new();
        let cx = tracing::Span::current().context();
        global::get_text_map_propagator(|propagator| {
            propagator.inject_context(&cx, &mut HeaderInjector(&mut headers));
        });

        let builder = self.client.request(method, url).headers(headers);
        match &self.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, BackendError> {
        tokio::select! {
            () = self.cancel.cancelled() => Err(BackendError::Cancelled),
            res = builder.send() => res.map_err(|e| BackendError::Unavailable(e.to_string())),
        }
    }

    async fn body(&self, res: Response) -> Result<Vec<u8>, BackendError> {
        let status = res.status();
        let url = res.url().to_string();
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                url,
            });
        }

        tokio::select! {
            () = self.cancel.cancelled() => Err(BackendError::Cancelled),
            bytes = res.bytes() => bytes
                .map(|b| b.to_vec())
                .map_err(|e| BackendError::Unavailable(e.to_string())),
        }
    }

    /// GET with retries on connection-level failures. Status errors are final.
    async fn get_response(&self, path: &str) -> Result<Response, BackendError> {
        let mut last_err = None;

        for attempt in 1..=self.max_retries {
            match self.send(self.request(Method::GET, path)).await {
                Ok(res) => {
                    tracing::debug!(status = %res.status(), attempt, path, "Backend responded");
                    return Ok(res);
                }
                Err(BackendError::Cancelled) => return Err(BackendError::Cancelled),
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        max_retries = self.max_retries,
                        error = %e,
                        path,
                        "Backend request failed, retrying"
                    );
                    last_err = Some(e);
                    if attempt < self.max_retries {
                        tokio::time::sleep(backoff(attempt)).await;
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| BackendError::Unavailable(path.to_string())))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        let res = self.get_response(path).await?;
        decode(&self.body(res).await?)
    }

    /// Like [`Self::get_json`], mapping 404 to `None`.
    async fn get_optional<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Option<T>, BackendError> {
        let res = self.get_response(path).await?;
        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        decode_optional(&self.body(res).await?)
    }

    async fn write<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<Vec<u8>, BackendError> {
        let res = self.send(self.request(method, path).json(body)).await?;
        tracing::debug!(status = %res.status(), path, "Backend responded");
        self.body(res).await
    }
}

#[async_trait]
impl RecipientStore for HttpBackendClient {
    #[tracing::instrument(skip(self))]
    async fn list_recipients(&self) -> Result<Vec<NotificationRecipient>, BackendError> {
        self.get_json("/api/v1/notification-recipients").await
    }

    #[tracing::instrument(skip(self))]
    async fn create_recipient(
        &self,
        recipient: NewRecipient,
    ) -> Result<NotificationRecipient, BackendError> {
        let body = self
            .write(Method::POST, "/api/v1/notification-recipients", &recipient)
            .await?;
        decode(&body)
    }

    #[tracing::instrument(skip(self, updates), fields(count = updates.len()))]
    async fn update_recipients(
        &self,
        updates: Vec<RecipientStateUpdate>,
    ) -> Result<(), BackendError> {
        self.write(
            Method::PUT,
            "/api/v1/notification-recipients/batch",
            &updates,
        )
        .await
        .map(|_| ())
    }
}

#[async_trait]
impl ContextFetcher for HttpBackendClient {
    #[tracing::instrument(skip(self))]
    async fn get_schedule(&self, schedule_id: Uuid) -> Result<Option<Schedule>, BackendError> {
        self.get_optional(&format!("/api/v1/schedules/{schedule_id}"))
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn get_team_members(&self, team_id: Uuid) -> Result<Vec<TeamMember>, BackendError> {
        self.get_json(&format!("/api/v1/teams/{team_id}/members"))
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn get_shifts(&self, schedule_id: Uuid) -> Result<Vec<Shift>, BackendError> {
        self.get_json(&format!("/api/v1/schedules/{schedule_id}/shifts"))
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn get_schedule_history(
        &self,
        schedule_id: Uuid,
    ) -> Result<Vec<ScheduleChange>, BackendError> {
        self.get_json(&format!("/api/v1/schedules/{schedule_id}/history"))
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn get_shift_history(
        &self,
        schedule_id: Uuid,
    ) -> Result<Vec<ShiftChange>, BackendError> {
        self.get_json(&format!("/api/v1/schedules/{schedule_id}/shift-history"))
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn get_processes(&self, schedule_id: Uuid) -> Result<Vec<Process>, BackendError> {
        self.get_json(&format!("/api/v1/schedules/{schedule_id}/processes"))
            .await
    }
}

#[async_trait]
impl NotificationTransport for HttpBackendClient {
    #[tracing::instrument(skip(self, messages), fields(count = messages.len()))]
    async fn send_batch(&self, messages: Vec<NotificationMessage>) -> Result<(), BackendError> {
        let wire: Vec<OutgoingMessage<'_>> = messages
            .iter()
            .map(|m| OutgoingMessage {
                address: &m.recipient_address,
                subject: &m.subject,
                body_html: &m.body_html,
                is_automatic: m.is_automatic,
                related_schedule_id: m.related_schedule_id,
            })
            .collect();

        let body = self
            .write(Method::POST, "/api/v1/notifications/batch", &wire)
            .await?;
        BatchStatus::from_body(&body).into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(base_url: String, bearer_token: Option<&str>) -> HttpBackendClient {
        HttpBackendClient::new(&BackendConfig {
            base_url,
            timeout_secs: 5,
            max_retries: 2,
            bearer_token: bearer_token.map(str::to_string),
        })
    }

    fn recipient_json(address: &str) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "address": address,
            "is_permanent": false,
            "is_selected": true,
        })
    }

    #[tokio::test]
    async fn list_recipients_sends_bearer_token_and_unwraps_envelope() {
        let server = MockServer::start_async().await;
        let m = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/v1/notification-recipients")
                    .header("authorization", "Bearer s3cret");
                then.status(200).json_body(json!({
                    "success": true,
                    "data": [recipient_json("a@h.org"), recipient_json("b@h.org")],
                }));
            })
            .await;

        let client = client_for(server.base_url(), Some("s3cret"));
        let output = client.list_recipients().await.unwrap();

        m.assert_async().await;
        assert_eq!(output.len(), 2);
        assert_eq!(output[1].address, "b@h.org");
    }

    #[tokio::test]
    async fn missing_schedule_maps_to_none() {
        let server = MockServer::start_async().await;
        let schedule_id = Uuid::new_v4();
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path(format!("/api/v1/schedules/{schedule_id}"));
                then.status(404);
            })
            .await;

        let client = client_for(server.base_url(), None);
        let output = client.get_schedule(schedule_id).await.unwrap();

        assert!(output.is_none());
    }

    #[tokio::test]
    async fn bare_schedule_is_found() {
        let server = MockServer::start_async().await;
        let schedule_id = Uuid::new_v4();
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path(format!("/api/v1/schedules/{schedule_id}"));
                then.status(200)
                    .json_body(json!({ "id": schedule_id, "name": "Cuadro A" }));
            })
            .await;

        let client = client_for(server.base_url(), None);
        let output = client.get_schedule(schedule_id).await.unwrap().unwrap();

        assert_eq!(output.name.as_deref(), Some("Cuadro A"));
    }

    #[tokio::test]
    async fn server_error_is_not_retried() {
        let server = MockServer::start_async().await;
        let schedule_id = Uuid::new_v4();
        let m = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path(format!("/api/v1/schedules/{schedule_id}/shifts"));
                then.status(500);
            })
            .await;

        let client = client_for(server.base_url(), None);
        let output = client.get_shifts(schedule_id).await;

        m.assert_async().await;
        assert!(matches!(
            output.unwrap_err(),
            BackendError::Status { status: 500, .. }
        ));
    }

    #[test]
    fn backoff_doubles_then_caps() {
        assert_eq!(backoff(1), Duration::from_millis(100));
        assert_eq!(backoff(2), Duration::from_millis(200));
        assert_eq!(backoff(7), Duration::from_millis(6400));
        assert_eq!(backoff(65), Duration::from_millis(6400));
        assert_eq!(backoff(u32::MAX), Duration::from_millis(6400));
    }

    #[tokio::test]
    async fn unreachable_backend_is_unavailable() {
        let client = client_for("http://127.0.0.1:1".to_string(), None);
        let output = client.get_processes(Uuid::new_v4()).await;
        assert!(matches!(output.unwrap_err(), BackendError::Unavailable(_)));
    }

    #[tokio::test]
    async fn cancelled_token_stops_requests() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let client =
            client_for("http://127.0.0.1:1".to_string(), None).with_cancellation(cancel);

        let output = client.get_shifts(Uuid::new_v4()).await;

        assert!(matches!(output.unwrap_err(), BackendError::Cancelled));
    }

    #[tokio::test]
    async fn send_batch_posts_wire_messages() {
        let server = MockServer::start_async().await;
        let schedule_id = Uuid::new_v4();
        let m = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/v1/notifications/batch")
                    .json_body(json!([{
                        "address": "a@h.org",
                        "subject": "Asunto",
                        "body_html": "<p>Hola</p>",
                        "is_automatic": true,
                        "related_schedule_id": schedule_id,
                    }]));
                then.status(200).json_body(json!({ "success": true }));
            })
            .await;

        let client = client_for(server.base_url(), None);
        client
            .send_batch(vec![NotificationMessage {
                recipient_address: "a@h.org".to_string(),
                subject: "Asunto".to_string(),
                body_html: "<p>Hola</p>".to_string(),
                sent_at: Utc::now(),
                is_automatic: true,
                related_schedule_id: Some(schedule_id),
            }])
            .await
            .unwrap();

        m.assert_async().await;
    }

    #[tokio::test]
    async fn send_batch_reported_failure_is_rejected() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v1/notifications/batch");
                then.status(200)
                    .json_body(json!({ "success": false, "error": "smtp down" }));
            })
            .await;

        let client = client_for(server.base_url(), None);
        let output = client.send_batch(vec![]).await;

        assert!(matches!(output.unwrap_err(), BackendError::Rejected(_)));
    }

    #[tokio::test]
    async fn update_recipients_puts_batch() {
        let server = MockServer::start_async().await;
        let id = Uuid::new_v4();
        let m = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/api/v1/notification-recipients/batch")
                    .json_body(json!([{ "id": id, "is_permanent": true, "is_selected": false }]));
                then.status(204);
            })
            .await;

        let client = client_for(server.base_url(), None);
        client
            .update_recipients(vec![RecipientStateUpdate {
                id,
                is_permanent: true,
                is_selected: false,
            }])
            .await
            .unwrap();

        m.assert_async().await;
    }
}
