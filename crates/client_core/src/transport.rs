//! Bookings API port and its reqwest implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Booking, BookingId, UserProfile},
    error::ApiException,
    protocol::BookingPayload,
};
use tracing::debug;
use url::Url;

use crate::error::BookingApiError;

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
pub trait BookingsApi: Send + Sync {
    async fn list_bookings(&self) -> Result<Vec<Booking>, BookingApiError>;
    async fn create_booking(&self, payload: &BookingPayload) -> Result<Booking, BookingApiError>;
    async fn update_booking(
        &self,
        id: &BookingId,
        payload: &BookingPayload,
    ) -> Result<Booking, BookingApiError>;
    async fn cancel_booking(&self, id: &BookingId) -> Result<(), BookingApiError>;
    async fn fetch_user_info(&self) -> Result<UserProfile, BookingApiError>;
}

/// Offline stand-in: every call fails as if the network were down.
pub struct MissingBookingsApi;

#[async_trait]
impl BookingsApi for MissingBookingsApi {
    async fn list_bookings(&self) -> Result<Vec<Booking>, BookingApiError> {
        Err(BookingApiError::Unavailable("offline mode".to_string()))
    }

    async fn create_booking(&self, _payload: &BookingPayload) -> Result<Booking, BookingApiError> {
        Err(BookingApiError::Unavailable("offline mode".to_string()))
    }

    async fn update_booking(
        &self,
        id: &BookingId,
        _payload: &BookingPayload,
    ) -> Result<Booking, BookingApiError> {
        Err(BookingApiError::Unavailable(format!(
            "offline mode, cannot update booking {id}"
        )))
    }

    async fn cancel_booking(&self, id: &BookingId) -> Result<(), BookingApiError> {
        Err(BookingApiError::Unavailable(format!(
            "offline mode, cannot cancel booking {id}"
        )))
    }

    async fn fetch_user_info(&self) -> Result<UserProfile, BookingApiError> {
        Err(BookingApiError::Unavailable("offline mode".to_string()))
    }
}

pub struct HttpBookingsApi {
    http: Client,
    base_url: Url,
}

impl HttpBookingsApi {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, BookingApiError> {
        let http = Client::builder().timeout(timeout).build()?;
        Self::with_client(base_url, http)
    }

    pub fn with_client(base_url: Url, http: Client) -> Result<Self, BookingApiError> {
        if base_url.cannot_be_a_base() {
            return Err(BookingApiError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self { http, base_url })
    }

    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, BookingApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| BookingApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl BookingsApi for HttpBookingsApi {
    async fn list_bookings(&self) -> Result<Vec<Booking>, BookingApiError> {
        let url = self.endpoint(&["api", "bookings"])?;
        let response = self.http.get(url).send().await?;
        read_json(response).await
    }

    async fn create_booking(&self, payload: &BookingPayload) -> Result<Booking, BookingApiError> {
        let url = self.endpoint(&["api", "bookings"])?;
        debug!(service = %payload.service, date = %payload.date, time = %payload.time, "http: POST booking");
        let response = self.http.post(url).json(payload).send().await?;
        read_json(response).await
    }

    async fn update_booking(
        &self,
        id: &BookingId,
        payload: &BookingPayload,
    ) -> Result<Booking, BookingApiError> {
        let url = self.endpoint(&["api", "bookings", id.as_str()])?;
        debug!(booking_id = %id, "http: PUT booking");
        let response = self.http.put(url).json(payload).send().await?;
        read_json(response).await
    }

    async fn cancel_booking(&self, id: &BookingId) -> Result<(), BookingApiError> {
        let url = self.endpoint(&["api", "bookings", id.as_str()])?;
        debug!(booking_id = %id, "http: DELETE booking");
        let response = self.http.delete(url).send().await?;
        check_status(response).await?;
        Ok(())
    }

    async fn fetch_user_info(&self) -> Result<UserProfile, BookingApiError> {
        let url = self.endpoint(&["api", "user-info"])?;
        let response = self.http.get(url).send().await?;
        read_json(response).await
    }
}

async fn check_status(response: Response) -> Result<Response, BookingApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let exception = ApiException::from_response(status.as_u16(), &body);
    Err(BookingApiError::Status {
        status: status.as_u16(),
        code: exception.code,
        message: exception.message,
    })
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, BookingApiError> {
    let response = check_status(response).await?;
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| BookingApiError::Decode(e.to_string()))
}
