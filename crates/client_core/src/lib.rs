use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::Result;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, NaiveDate, Utc};
use shared::{
    domain::{Booking, BookingForm, BookingId, BookingStatus, ServiceKind, UserProfile},
    protocol::BookingPayload,
};
use storage::{KeyValueStore, ProfileStore};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};
use url::Url;

pub mod error;
pub mod slots;
pub mod transport;
pub mod types;
pub mod validation;

pub use error::BookingApiError;
pub use slots::compute_available_slots;
pub use transport::{BookingsApi, HttpBookingsApi, MissingBookingsApi, DEFAULT_HTTP_TIMEOUT};
pub use types::{
    ActiveView, CachedBooking, CancelOutcome, ClientEvent, FormState, NotificationLevel,
    ProfileRefresh, SubmitOutcome,
};
pub use validation::{validate_email, validate_phone};

const LOCAL_ID_PREFIX: &str = "BK";
const LOCAL_ID_MODULUS: i64 = 1_000_000;
const LOGIN_SUCCESS_PARAM: &str = "login_success";
const LOGIN_CALLBACK_PATH_MARKER: &str = "authorized";
const FALLBACK_AVATAR_SVG: &str = r##"<svg width="40" height="40" viewBox="0 0 40 40" fill="none" xmlns="http://www.w3.org/2000/svg"><rect width="40" height="40" rx="20" fill="#667eea"/><circle cx="20" cy="15" r="5" fill="white"/><path d="M20 22C16.7 22 14 24.7 14 28H26C26 24.7 23.3 22 20 22Z" fill="white"/></svg>"##;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// How long an updated entry stays highlighted before the list is refreshed.
    pub highlight_duration: Duration,
    /// Minimum spacing between server profile refreshes.
    pub profile_refresh_interval: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            highlight_duration: Duration::from_secs(3),
            profile_refresh_interval: Duration::from_secs(5 * 60),
        }
    }
}

/// State behind the booking form and the "my bookings" list.
///
/// Every network failure is terminal for the user action that caused it: it
/// is logged, sometimes surfaced as a notification, and never retried.
pub struct BookingFormController {
    api: Arc<dyn BookingsApi>,
    profiles: ProfileStore,
    clock: Arc<dyn Clock>,
    settings: ControllerSettings,
    inner: Mutex<FormState>,
    highlight_generation: AtomicU64,
    events: broadcast::Sender<ClientEvent>,
}

impl BookingFormController {
    pub fn new(api: Arc<dyn BookingsApi>, store: Arc<dyn KeyValueStore>) -> Arc<Self> {
        Self::new_with_dependencies(
            api,
            store,
            Arc::new(SystemClock),
            ControllerSettings::default(),
        )
    }

    pub fn new_with_dependencies(
        api: Arc<dyn BookingsApi>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        settings: ControllerSettings,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            api,
            profiles: ProfileStore::new(store),
            clock,
            settings,
            inner: Mutex::new(FormState::default()),
            highlight_generation: AtomicU64::new(0),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> FormState {
        self.inner.lock().await.clone()
    }

    pub async fn bookings(&self) -> Vec<CachedBooking> {
        self.inner.lock().await.bookings.clone()
    }

    fn emit(&self, event: ClientEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn notify(&self, level: NotificationLevel, message: impl Into<String>) {
        self.emit(ClientEvent::Notification {
            level,
            message: message.into(),
        });
    }

    /// Rehydrates the profile, computes slots and loads the booking list.
    ///
    /// `embedded_profile` is the profile the host page was rendered with; it
    /// is only used (and persisted) when nothing is cached locally.
    pub async fn init(&self, embedded_profile: Option<UserProfile>) {
        self.load_user_info(embedded_profile).await;
        self.update_available_slots().await;
        let _ = self.fetch_bookings().await;
    }

    async fn load_user_info(&self, embedded_profile: Option<UserProfile>) {
        let mut profile = self.profiles.load_profile().await;

        if profile.is_none() {
            if let Some(embedded) = embedded_profile.filter(UserProfile::is_complete) {
                if let Err(err) = self.profiles.save_profile(&embedded).await {
                    warn!(error = %err, "profile: failed to cache embedded profile");
                }
                profile = Some(embedded);
            }
        }

        if let Some(profile) = profile.filter(UserProfile::is_complete) {
            self.apply_profile(&profile).await;
        }
    }

    async fn apply_profile(&self, profile: &UserProfile) {
        {
            let mut guard = self.inner.lock().await;
            guard.draft.name = profile.name.clone();
            guard.draft.email = profile.email.clone();
            if profile.picture.is_some() {
                guard.avatar = profile.picture.clone();
            }
        }

        if let Some(picture) = &profile.picture {
            self.emit(ClientEvent::AvatarChanged(Some(picture.clone())));
        }
    }

    pub async fn update_available_slots(&self) {
        self.inner.lock().await.refresh_slots();
    }

    pub async fn select_service(&self, service: ServiceKind) {
        self.inner.lock().await.selected_service = Some(service);
    }

    /// Changing the date drops a selected time that is no longer offered.
    pub async fn select_date(&self, date: Option<NaiveDate>) {
        let mut guard = self.inner.lock().await;
        guard.selected_date = date;
        guard.refresh_slots();
        let still_offered = guard
            .selected_time
            .as_ref()
            .is_some_and(|time| guard.available_slots.contains(time));
        if !still_offered {
            guard.selected_time = None;
        }
    }

    pub async fn select_time(&self, time: impl Into<String>) {
        self.inner.lock().await.selected_time = Some(time.into());
    }

    pub async fn update_draft(&self, edit: impl FnOnce(&mut BookingForm)) {
        edit(&mut self.inner.lock().await.draft);
    }

    pub async fn set_active_view(&self, view: ActiveView) {
        self.inner.lock().await.active_view = view;
        self.emit(ClientEvent::ActiveViewChanged(view));
    }

    pub async fn can_submit(&self) -> bool {
        self.inner.lock().await.can_submit()
    }

    pub async fn exit_edit_mode(&self) {
        self.inner.lock().await.editing = None;
    }

    pub async fn dismiss_success_modal(&self) {
        self.inner.lock().await.success_modal_open = false;
    }

    /// Clears the selection and re-fills the draft from the cached profile.
    pub async fn reset_form(&self) {
        let profile = self.profiles.load_profile().await;
        self.inner.lock().await.reset_form(profile.as_ref());
    }

    /// Records the current draft as a confirmed booking without contacting the server.
    pub async fn submit_local(&self) -> Option<Booking> {
        let payload = self.inner.lock().await.payload()?;
        Some(self.record_local(payload).await)
    }

    async fn record_local(&self, payload: BookingPayload) -> Booking {
        let now = self.clock.now();
        let profile = self.profiles.load_profile().await;
        let booking = {
            let mut guard = self.inner.lock().await;
            let id = synthesize_booking_id(now, &guard.bookings);
            let booking = confirmed_booking(id, payload);
            record_confirmed(&mut guard, booking.clone(), profile.as_ref());
            booking
        };

        info!(booking_id = %booking.id, "booking: recorded locally");
        self.emit(ClientEvent::BookingsChanged);
        self.emit(ClientEvent::BookingConfirmed(booking.clone()));
        booking
    }

    /// Sends the draft to the server: an update in edit mode, a create otherwise.
    pub async fn submit_remote(self: &Arc<Self>) -> SubmitOutcome {
        let (payload, editing) = {
            let guard = self.inner.lock().await;
            match guard.payload() {
                Some(payload) => (payload, guard.editing.clone()),
                None => return SubmitOutcome::NotReady,
            }
        };

        match editing {
            Some(id) => self.submit_update(id, payload).await,
            None => self.submit_create(payload).await,
        }
    }

    async fn submit_create(&self, payload: BookingPayload) -> SubmitOutcome {
        match self.api.create_booking(&payload).await {
            Ok(created) => {
                let profile = self.profiles.load_profile().await;
                record_confirmed(
                    &mut *self.inner.lock().await,
                    created.clone(),
                    profile.as_ref(),
                );
                info!(booking_id = %created.id, "booking: created");
                self.emit(ClientEvent::BookingsChanged);
                self.emit(ClientEvent::BookingConfirmed(created.clone()));
                let _ = self.fetch_bookings().await;
                SubmitOutcome::Created(created)
            }
            Err(BookingApiError::Decode(reason)) => {
                warn!(%reason, "booking: create accepted but response unreadable");
                let local = self.record_local(payload).await;
                let _ = self.fetch_bookings().await;
                SubmitOutcome::Created(local)
            }
            Err(err) => {
                error!(error = %err, "booking: create failed, keeping booking locally");
                SubmitOutcome::CreatedLocally(self.record_local(payload).await)
            }
        }
    }

    async fn submit_update(self: &Arc<Self>, id: BookingId, payload: BookingPayload) -> SubmitOutcome {
        let updated = match self.api.update_booking(&id, &payload).await {
            Ok(updated) => updated,
            Err(err) => {
                error!(booking_id = %id, error = %err, "booking: update failed");
                return SubmitOutcome::UpdateFailed(err.to_string());
            }
        };

        let generation = self.highlight_generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut guard = self.inner.lock().await;
            if let Some(entry) = guard
                .bookings
                .iter_mut()
                .find(|entry| entry.booking.id == id)
            {
                entry.booking = updated.clone();
                entry.highlight = true;
                entry.highlight_generation = generation;
            }
            guard.editing = None;
            guard.active_view = ActiveView::MyBookings;
        }

        info!(booking_id = %id, "booking: updated");
        self.emit(ClientEvent::BookingsChanged);
        self.notify(NotificationLevel::Success, "Booking updated successfully!");
        self.emit(ClientEvent::ActiveViewChanged(ActiveView::MyBookings));
        self.schedule_highlight_clear(updated.id.clone(), generation);
        SubmitOutcome::Updated(updated)
    }

    /// Clears the highlight on `id` after the configured delay, then reloads
    /// the list unless a newer update or edit has started since. A newer
    /// update of the same entry keeps its highlight for its own full delay.
    fn schedule_highlight_clear(self: &Arc<Self>, id: BookingId, generation: u64) {
        let this = Arc::clone(self);
        let delay = self.settings.highlight_duration;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut guard = this.inner.lock().await;
                if let Some(entry) = guard
                    .bookings
                    .iter_mut()
                    .find(|entry| entry.booking.id == id && entry.highlight_generation == generation)
                {
                    entry.highlight = false;
                }
            }
            this.emit(ClientEvent::BookingsChanged);

            if this.highlight_generation.load(Ordering::SeqCst) != generation {
                debug!(booking_id = %id, "booking: skipping stale post-update refresh");
                return;
            }
            let _ = this.fetch_bookings().await;
        });
    }

    /// Replaces the cached list with the server's. On failure the cached list
    /// is left as it was.
    pub async fn fetch_bookings(&self) -> std::result::Result<(), BookingApiError> {
        let bookings = match self.api.list_bookings().await {
            Ok(bookings) => bookings,
            Err(err) => {
                error!(error = %err, "bookings: failed to fetch list");
                return Err(err);
            }
        };

        let count = bookings.len();
        self.inner.lock().await.bookings = bookings.into_iter().map(CachedBooking::new).collect();
        debug!(count, "bookings: list refreshed");
        self.emit(ClientEvent::BookingsChanged);
        Ok(())
    }

    pub async fn edit_booking(&self, booking: &Booking) {
        self.highlight_generation.fetch_add(1, Ordering::SeqCst);
        {
            let mut guard = self.inner.lock().await;
            guard.editing = Some(booking.id.clone());
            guard.selected_service = Some(booking.service);
            guard.selected_date = Some(booking.date);
            guard.selected_time = Some(booking.time.clone());
            guard.draft = BookingForm {
                name: booking.name.clone(),
                email: booking.email.clone(),
                phone: booking.phone.clone(),
                notes: booking.notes.clone(),
            };
            guard.active_view = ActiveView::Booking;
            guard.refresh_slots();
        }
        debug!(booking_id = %booking.id, "booking: editing");
        self.emit(ClientEvent::ActiveViewChanged(ActiveView::Booking));
    }

    pub async fn open_cancel(&self, id: BookingId) {
        let mut guard = self.inner.lock().await;
        guard.pending_cancel = Some(id);
        guard.cancel_modal_open = true;
    }

    pub async fn close_cancel_modal(&self) {
        let mut guard = self.inner.lock().await;
        guard.pending_cancel = None;
        guard.cancel_modal_open = false;
    }

    /// Cancels the booking chosen with [`open_cancel`](Self::open_cancel).
    /// The cached entry keeps every field except its status.
    pub async fn confirm_cancel(&self) -> CancelOutcome {
        let pending = self.inner.lock().await.pending_cancel.clone();

        let outcome = match pending {
            None => CancelOutcome::NothingPending,
            Some(id) => match self.api.cancel_booking(&id).await {
                Ok(()) => {
                    {
                        let mut guard = self.inner.lock().await;
                        for entry in guard
                            .bookings
                            .iter_mut()
                            .filter(|entry| entry.booking.id == id)
                        {
                            entry.booking.status = BookingStatus::Cancelled;
                        }
                    }
                    info!(booking_id = %id, "booking: cancelled");
                    self.emit(ClientEvent::BookingsChanged);
                    self.notify(NotificationLevel::Success, "Booking cancelled successfully!");
                    let _ = self.fetch_bookings().await;
                    CancelOutcome::Cancelled(id)
                }
                Err(err) => {
                    warn!(booking_id = %id, error = %err, "booking: cancel failed");
                    let message = if err.is_network() {
                        "Network error while cancelling booking."
                    } else {
                        "Failed to cancel booking."
                    };
                    self.notify(NotificationLevel::Error, message);
                    CancelOutcome::Failed(err.to_string())
                }
            },
        };

        self.close_cancel_modal().await;
        outcome
    }

    /// Pulls the profile from the server, at most once per refresh interval.
    pub async fn refresh_profile(&self) -> ProfileRefresh {
        let now = self.clock.now();
        if let Some(last) = self.profiles.last_refresh().await {
            let elapsed_ms = now.timestamp_millis() - last.timestamp_millis();
            let interval_ms =
                i64::try_from(self.settings.profile_refresh_interval.as_millis()).unwrap_or(i64::MAX);
            if elapsed_ms < interval_ms {
                debug!(elapsed_ms, "profile: refresh rate limited, using cached data");
                return ProfileRefresh::RateLimited;
            }
        }

        let profile = match self.api.fetch_user_info().await {
            Ok(profile) => profile,
            Err(err) => {
                error!(error = %err, "profile: failed to fetch user info");
                return ProfileRefresh::Failed(err.to_string());
            }
        };

        if !profile.is_complete() {
            debug!("profile: server returned an incomplete profile");
            return ProfileRefresh::Incomplete;
        }

        if let Err(err) = self.profiles.save_profile(&profile).await {
            warn!(error = %err, "profile: failed to cache refreshed profile");
        }
        self.apply_profile(&profile).await;
        if let Err(err) = self.profiles.record_refresh(now).await {
            warn!(error = %err, "profile: failed to record refresh time");
        }
        ProfileRefresh::Refreshed(profile)
    }

    /// Handles the page URL after an OAuth round trip.
    ///
    /// Returns `None` when `url` is not a login callback. Otherwise refreshes
    /// the profile and returns the URL with the `login_success` flag removed.
    pub async fn complete_login(&self, url: &Url) -> Option<Url> {
        let has_flag = url.query_pairs().any(|(key, _)| key == LOGIN_SUCCESS_PARAM);
        if !has_flag && !url.path().contains(LOGIN_CALLBACK_PATH_MARKER) {
            return None;
        }

        let refresh = self.refresh_profile().await;
        debug!(?refresh, "profile: login callback handled");

        let mut cleaned = url.clone();
        if has_flag {
            let kept: Vec<(String, String)> = url
                .query_pairs()
                .filter(|(key, _)| key != LOGIN_SUCCESS_PARAM)
                .map(|(key, value)| (key.into_owned(), value.into_owned()))
                .collect();
            if kept.is_empty() {
                cleaned.set_query(None);
            } else {
                let mut pairs = cleaned.query_pairs_mut();
                pairs.clear();
                for (key, value) in &kept {
                    pairs.append_pair(key, value);
                }
            }
        }
        Some(cleaned)
    }

    /// Forgets the cached profile (logout).
    pub async fn clear_profile(&self) -> Result<()> {
        self.profiles.clear_profile().await?;
        {
            let mut guard = self.inner.lock().await;
            guard.draft.name.clear();
            guard.draft.email.clear();
            guard.avatar = None;
        }
        self.emit(ClientEvent::AvatarChanged(None));
        Ok(())
    }

    pub async fn avatar_or_fallback(&self) -> String {
        match self.inner.lock().await.avatar.clone() {
            Some(picture) => picture,
            None => fallback_avatar(),
        }
    }
}

pub fn fallback_avatar() -> String {
    format!(
        "data:image/svg+xml;base64,{}",
        STANDARD.encode(FALLBACK_AVATAR_SVG)
    )
}

/// `BK` plus the last six digits of the epoch milliseconds, bumped until it
/// does not collide with a cached id.
fn synthesize_booking_id(now: DateTime<Utc>, existing: &[CachedBooking]) -> BookingId {
    let mut suffix = now.timestamp_millis().rem_euclid(LOCAL_ID_MODULUS);
    loop {
        let candidate = BookingId(format!("{LOCAL_ID_PREFIX}{suffix:06}"));
        if !existing.iter().any(|entry| entry.booking.id == candidate) {
            return candidate;
        }
        suffix = (suffix + 1) % LOCAL_ID_MODULUS;
    }
}

fn confirmed_booking(id: BookingId, payload: BookingPayload) -> Booking {
    Booking {
        id,
        service: payload.service,
        date: payload.date,
        time: payload.time,
        name: payload.name,
        email: payload.email,
        phone: payload.phone,
        notes: payload.notes,
        status: BookingStatus::Confirmed,
    }
}

fn record_confirmed(state: &mut FormState, booking: Booking, profile: Option<&UserProfile>) {
    state.push_front(booking.clone());
    state.last_booking = Some(booking);
    state.success_modal_open = true;
    state.reset_form(profile);
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
