//! Plain-text output for the terminal.

use client_core::CachedBooking;
use shared::{
    domain::{format_long_date, Booking},
    protocol::ServiceSummary,
};

pub fn service_line(service: &ServiceSummary) -> String {
    format!(
        "{:<8} {:<14} {:<10} {}",
        service.id.as_str(),
        service.name,
        service.price,
        service.description
    )
}

pub fn booking_line(entry: &CachedBooking) -> String {
    let booking = &entry.booking;
    let marker = if entry.highlight { "*" } else { " " };
    format!(
        "{marker} {:<12} {:<10} {} {} {:<14} {}",
        booking.id.as_str(),
        booking.status.as_str(),
        booking.date,
        booking.time,
        booking.service.display_name(),
        booking.name
    )
}

/// Multi-line confirmation shown after a booking is recorded.
pub fn confirmation(booking: &Booking) -> String {
    let mut lines = vec![
        format!("Booking ID: {}", booking.id),
        format!("Service:    {}", booking.service.display_name()),
        format!("Date:       {}", format_long_date(booking.date)),
        format!("Time:       {}", booking.time),
        format!("Name:       {}", booking.name),
    ];
    if !booking.notes.is_empty() {
        lines.push(format!("Notes:      {}", booking.notes));
    }
    lines.join("\n")
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
