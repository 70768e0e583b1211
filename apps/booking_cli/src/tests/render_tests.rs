use chrono::NaiveDate;
use shared::{
    domain::{BookingId, BookingStatus, ServiceKind},
    protocol::service_catalog,
};

use super::*;

fn booking(notes: &str) -> Booking {
    Booking {
        id: BookingId::from("BK000042"),
        service: ServiceKind::Meeting,
        date: NaiveDate::from_ymd_opt(2099, 1, 1).expect("date"),
        time: "14:30".into(),
        name: "Ada".into(),
        email: "ada@example.com".into(),
        phone: "+15551234567".into(),
        notes: notes.into(),
        status: BookingStatus::Cancelled,
    }
}

#[test]
fn confirmation_uses_long_date_and_skips_empty_notes() {
    let text = confirmation(&booking(""));
    assert!(text.contains("Thursday, January 1, 2099"));
    assert!(text.contains("Meeting Room"));
    assert!(!text.contains("Notes"));

    assert!(confirmation(&booking("window seat")).contains("Notes:      window seat"));
}

#[test]
fn booking_line_marks_highlighted_entries() {
    let mut entry = CachedBooking::new(booking(""));
    assert!(booking_line(&entry).starts_with("  BK000042"));
    assert!(booking_line(&entry).contains("cancelled"));

    entry.highlight = true;
    assert!(booking_line(&entry).starts_with("* BK000042"));
}

#[test]
fn service_line_leads_with_wire_name() {
    let catalog = service_catalog();
    assert!(service_line(&catalog[2]).starts_with("spa "));
}
