use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

id_newtype!(BookingId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    Room,
    Meeting,
    Spa,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 3] = [ServiceKind::Room, ServiceKind::Meeting, ServiceKind::Spa];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Room => "room",
            ServiceKind::Meeting => "meeting",
            ServiceKind::Spa => "spa",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ServiceKind::Room => "Hotel Room",
            ServiceKind::Meeting => "Meeting Room",
            ServiceKind::Spa => "Spa Treatment",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ServiceKind::Room => "Comfortable accommodation",
            ServiceKind::Meeting => "Professional meeting space",
            ServiceKind::Spa => "Relaxing wellness services",
        }
    }

    pub fn price_label(&self) -> &'static str {
        match self {
            ServiceKind::Room => "$150/night",
            ServiceKind::Meeting => "$75/hour",
            ServiceKind::Spa => "$120/session",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ServiceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "room" => Ok(ServiceKind::Room),
            "meeting" => Ok(ServiceKind::Meeting),
            "spa" => Ok(ServiceKind::Spa),
            other => Err(format!("unknown service '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Confirmed,
    Pending,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Pending => "pending",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub service: ServiceKind,
    pub date: NaiveDate,
    pub time: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub notes: String,
    pub status: BookingStatus,
}

/// Draft form fields that have not been submitted yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub notes: String,
}

impl BookingForm {
    pub fn prefilled(profile: Option<&UserProfile>) -> Self {
        match profile {
            Some(profile) => Self {
                name: profile.name.clone(),
                email: profile.email.clone(),
                ..Self::default()
            },
            None => Self::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

impl UserProfile {
    pub fn is_complete(&self) -> bool {
        !self.name.is_empty() && !self.email.is_empty()
    }
}

/// Long human date, e.g. `Friday, January 1, 2099`.
pub fn format_long_date(date: NaiveDate) -> String {
    date.format("%A, %B %-d, %Y").to_string()
}
