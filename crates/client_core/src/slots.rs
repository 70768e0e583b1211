use chrono::NaiveDate;

pub const DAY_START_HOUR: u32 = 8;
pub const DAY_END_HOUR: u32 = 20;

/// Bookable start times for `date`: every half hour from 08:00 through 19:30.
///
/// Existing bookings are not consulted, so overlapping requests are possible.
pub fn compute_available_slots(date: Option<NaiveDate>) -> Vec<String> {
    if date.is_none() {
        return Vec::new();
    }

    (DAY_START_HOUR..DAY_END_HOUR)
        .flat_map(|hour| [format!("{hour:02}:00"), format!("{hour:02}:30")])
        .collect()
}
