use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{BookingForm, ServiceKind};

/// Body of `POST /api/bookings` and `PUT /api/bookings/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingPayload {
    pub service: ServiceKind,
    pub date: NaiveDate,
    pub time: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub notes: String,
}

impl BookingPayload {
    pub fn from_parts(
        service: ServiceKind,
        date: NaiveDate,
        time: impl Into<String>,
        form: &BookingForm,
    ) -> Self {
        Self {
            service,
            date,
            time: time.into(),
            name: form.name.clone(),
            email: form.email.clone(),
            phone: form.phone.clone(),
            notes: form.notes.clone(),
        }
    }
}

/// Entry of the service catalog shown on the booking form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSummary {
    pub id: ServiceKind,
    pub name: String,
    pub description: String,
    pub price: String,
}

impl From<ServiceKind> for ServiceSummary {
    fn from(kind: ServiceKind) -> Self {
        Self {
            id: kind,
            name: kind.display_name().to_string(),
            description: kind.description().to_string(),
            price: kind.price_label().to_string(),
        }
    }
}

pub fn service_catalog() -> Vec<ServiceSummary> {
    ServiceKind::ALL.into_iter().map(ServiceSummary::from).collect()
}
