//! View state and events published by the booking form controller.

use chrono::NaiveDate;
use shared::{
    domain::{Booking, BookingForm, BookingId, ServiceKind, UserProfile},
    protocol::BookingPayload,
};

use crate::slots::compute_available_slots;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveView {
    #[default]
    Booking,
    MyBookings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedBooking {
    pub booking: Booking,
    /// Set for a short while after the entry was updated.
    pub highlight: bool,
    /// Update that set `highlight`; only that update's timer may clear it.
    pub(crate) highlight_generation: u64,
}

impl CachedBooking {
    pub fn new(booking: Booking) -> Self {
        Self {
            booking,
            highlight: false,
            highlight_generation: 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FormState {
    pub active_view: ActiveView,
    pub selected_service: Option<ServiceKind>,
    pub selected_date: Option<NaiveDate>,
    pub selected_time: Option<String>,
    pub available_slots: Vec<String>,
    pub draft: BookingForm,
    pub editing: Option<BookingId>,
    pub pending_cancel: Option<BookingId>,
    pub cancel_modal_open: bool,
    pub last_booking: Option<Booking>,
    pub success_modal_open: bool,
    pub bookings: Vec<CachedBooking>,
    pub avatar: Option<String>,
}

impl FormState {
    pub fn is_edit_mode(&self) -> bool {
        self.editing.is_some()
    }

    /// Only presence is checked; email and phone formats are not.
    pub fn can_submit(&self) -> bool {
        self.selected_service.is_some()
            && self.selected_date.is_some()
            && self
                .selected_time
                .as_deref()
                .is_some_and(|time| !time.is_empty())
            && !self.draft.name.is_empty()
            && !self.draft.email.is_empty()
            && !self.draft.phone.is_empty()
    }

    pub fn payload(&self) -> Option<BookingPayload> {
        if !self.can_submit() {
            return None;
        }
        Some(BookingPayload::from_parts(
            self.selected_service?,
            self.selected_date?,
            self.selected_time.clone()?,
            &self.draft,
        ))
    }

    pub fn find_booking(&self, id: &BookingId) -> Option<&CachedBooking> {
        self.bookings.iter().find(|entry| &entry.booking.id == id)
    }

    pub(crate) fn refresh_slots(&mut self) {
        self.available_slots = compute_available_slots(self.selected_date);
    }

    pub(crate) fn reset_form(&mut self, profile: Option<&UserProfile>) {
        self.selected_service = None;
        self.selected_date = None;
        self.selected_time = None;
        self.draft = BookingForm::prefilled(profile);
        self.editing = None;
        self.refresh_slots();
    }

    /// Puts `booking` at the head of the list, replacing any entry with the same id.
    pub(crate) fn push_front(&mut self, booking: Booking) {
        self.bookings.retain(|entry| entry.booking.id != booking.id);
        self.bookings.insert(0, CachedBooking::new(booking));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub enum ClientEvent {
    BookingsChanged,
    BookingConfirmed(Booking),
    Notification {
        level: NotificationLevel,
        message: String,
    },
    AvatarChanged(Option<String>),
    ActiveViewChanged(ActiveView),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Required fields are missing; nothing was sent.
    NotReady,
    Created(Booking),
    /// The server could not be reached or refused; the booking only exists locally.
    CreatedLocally(Booking),
    Updated(Booking),
    UpdateFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    NothingPending,
    Cancelled(BookingId),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileRefresh {
    RateLimited,
    Refreshed(UserProfile),
    Incomplete,
    Failed(String),
}
