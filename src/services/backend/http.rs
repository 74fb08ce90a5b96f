use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};

use super::wire::{self, BookingsEnvelope, SlotsEnvelope};
use super::{
    BookingBackend, BulkAvailabilityRequest, BulkAvailabilityResult, CustomBlockRequest, NotFound,
};
use crate::models::{BookingRecord, OperatingSlot};

pub struct HttpBackend {
    base_url: Url,
    token: String,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: &str, token: String, timeout_secs: u64) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url).with_context(|| format!("invalid backend url: {base_url}"))?;
        anyhow::ensure!(!base_url.cannot_be_a_base(), "backend url cannot be a base: {base_url}");

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            base_url,
            token,
            client,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> anyhow::Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("backend url cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> anyhow::Result<RequestBuilder> {
        let builder = self.client.request(method, self.endpoint(segments)?);
        Ok(if self.token.is_empty() {
            builder
        } else {
            builder.bearer_auth(&self.token)
        })
    }
}

/// Turns a non-2xx response into an error carrying the backend's message.
async fn check_status(resp: Response, what: &str) -> anyhow::Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .or_else(|| v.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or(body);
    if status == StatusCode::NOT_FOUND {
        return Err(NotFound(format!("{what} failed ({status}): {message}")).into());
    }
    anyhow::bail!("{what} failed ({status}): {message}")
}

#[async_trait]
impl BookingBackend for HttpBackend {
    async fn operating_slots(&self, academy_id: &str) -> anyhow::Result<Vec<OperatingSlot>> {
        tracing::debug!(academy_id, "fetching operating slots");

        let resp = self
            .request(Method::GET, &["api", "time-slots"])?
            .query(&[("academy_id", academy_id)])
            .send()
            .await
            .context("failed to call time-slots endpoint")?;

        let envelope: SlotsEnvelope = check_status(resp, "time-slots request")
            .await?
            .json()
            .await
            .context("failed to parse time-slots response")?;

        Ok(wire::normalize_slots(envelope))
    }

    async fn teacher_bookings(
        &self,
        teacher_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> anyhow::Result<Vec<BookingRecord>> {
        let from = from.to_rfc3339_opts(SecondsFormat::Millis, true);
        let to = to.to_rfc3339_opts(SecondsFormat::Millis, true);
        tracing::debug!(teacher_id, %from, %to, "fetching teacher bookings");

        let resp = self
            .request(Method::GET, &["api", "bookings"])?
            .query(&[
                ("teacher_id", teacher_id),
                ("from", from.as_str()),
                ("to", to.as_str()),
            ])
            .send()
            .await
            .context("failed to call bookings endpoint")?;

        let envelope: BookingsEnvelope = check_status(resp, "bookings request")
            .await?
            .json()
            .await
            .context("failed to parse bookings response")?;

        Ok(wire::normalize_bookings(envelope))
    }

    async fn create_availability(
        &self,
        request: &BulkAvailabilityRequest,
    ) -> anyhow::Result<BulkAvailabilityResult> {
        tracing::debug!(
            professor_id = %request.professor_id,
            academy_id = %request.academy_id,
            slots = request.slots.len(),
            "creating availability"
        );

        let resp = self
            .request(Method::POST, &["api", "bookings", "availability", "bulk"])?
            .json(request)
            .send()
            .await
            .context("failed to call bulk availability endpoint")?;

        check_status(resp, "bulk availability request")
            .await?
            .json()
            .await
            .context("failed to parse bulk availability response")
    }

    async fn delete_booking(&self, booking_id: &str) -> anyhow::Result<()> {
        tracing::debug!(booking_id, "deleting booking");

        let resp = self
            .request(Method::DELETE, &["api", "bookings", booking_id])?
            .send()
            .await
            .context("failed to call delete booking endpoint")?;

        check_status(resp, "delete booking request").await?;
        Ok(())
    }

    async fn block_hours(&self, teacher_id: &str, request: &CustomBlockRequest) -> anyhow::Result<()> {
        tracing::debug!(teacher_id, date = %request.date, hours = request.hours.len(), "blocking hours");

        let resp = self
            .request(Method::POST, &["api", "teachers", teacher_id, "blocks", "custom"])?
            .json(request)
            .send()
            .await
            .context("failed to call custom block endpoint")?;

        check_status(resp, "custom block request").await?;
        Ok(())
    }
}
