use shared::error::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BookingApiError {
    #[error("bookings api unavailable: {0}")]
    Unavailable(String),
    #[error("invalid bookings api url: {0}")]
    InvalidUrl(String),
    #[error("bookings api request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("bookings api returned {status} ({code:?}): {message}")]
    Status {
        status: u16,
        code: ErrorCode,
        message: String,
    },
    #[error("malformed bookings api response: {0}")]
    Decode(String),
}

impl BookingApiError {
    /// True when the request never produced an HTTP response.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            BookingApiError::Unavailable(_) | BookingApiError::Transport(_)
        )
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            BookingApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
