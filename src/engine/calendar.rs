use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::warn;

use crate::error::Error;
use crate::model::{DateSpan, ReservationId, RestrictionId, RoomId};

use super::Engine;

/// Day-key format used at the output boundary (`01-02-2006` in the
/// surrounding system's Go-style layout).
pub const DAY_KEY_FORMAT: &str = "%m-%d-%Y";

/// What occupies a calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayEntry {
    Free,
    Reservation(ReservationId),
    Block(RestrictionId),
}

/// Month occupancy for one room: a derived view rebuilt from restriction
/// rows on every request, never the source of truth.
///
/// Both sub-maps hold exactly one entry per calendar day of the month, `0`
/// meaning uncovered — the shape the admin calendar template edits in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthCalendar {
    pub room_id: RoomId,
    pub year: i32,
    pub month: u32,
    /// day → reservation id.
    pub reservation_map: BTreeMap<NaiveDate, i64>,
    /// day → block restriction id.
    pub block_map: BTreeMap<NaiveDate, i64>,
}

impl MonthCalendar {
    /// Combined per-day view. Reservation and block maps never cover the
    /// same day (blocks and reservations cannot overlap), so the order of
    /// the checks is immaterial.
    pub fn day(&self, day: NaiveDate) -> DayEntry {
        match self.reservation_map.get(&day) {
            Some(&id) if id != 0 => return DayEntry::Reservation(id),
            _ => {}
        }
        match self.block_map.get(&day) {
            Some(&id) if id != 0 => DayEntry::Block(id),
            _ => DayEntry::Free,
        }
    }

    pub fn days(&self) -> impl Iterator<Item = (NaiveDate, DayEntry)> + '_ {
        self.reservation_map.keys().map(|&d| (d, self.day(d)))
    }

    /// `MM-DD-YYYY`-keyed copy of the reservation sub-map for rendering.
    pub fn reservation_day_keys(&self) -> BTreeMap<String, i64> {
        day_keyed(&self.reservation_map)
    }

    /// `MM-DD-YYYY`-keyed copy of the block sub-map for rendering.
    pub fn block_day_keys(&self) -> BTreeMap<String, i64> {
        day_keyed(&self.block_map)
    }
}

fn day_keyed(map: &BTreeMap<NaiveDate, i64>) -> BTreeMap<String, i64> {
    map.iter()
        .map(|(d, &id)| (d.format(DAY_KEY_FORMAT).to_string(), id))
        .collect()
}

/// `[first of month, first of next month)`.
pub(crate) fn month_span(year: i32, month: u32) -> Result<DateSpan, Error> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or(Error::LimitExceeded("month out of range"))?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or(Error::LimitExceeded("month out of range"))?;
    Ok(DateSpan::new(first, next))
}

impl Engine {
    /// Expand one month of restrictions into per-day occupancy maps.
    ///
    /// Reservation-backed restrictions paint every day they touch, checkout
    /// day included, so the admin sees the full footprint of a stay. Manual
    /// blocks are day-granular and paint only their start day. Days outside
    /// the month are clamped away.
    pub async fn project_month(
        &self,
        room_id: RoomId,
        year: i32,
        month: u32,
    ) -> Result<MonthCalendar, Error> {
        let window = month_span(year, month)?;
        self.store.room(room_id).await?;

        let mut reservation_map: BTreeMap<NaiveDate, i64> =
            window.days().map(|d| (d, 0)).collect();
        let mut block_map = reservation_map.clone();

        for restriction in self
            .store
            .restrictions_for_room_in_range(room_id, window)
            .await?
        {
            if let Some(reservation_id) = restriction.reservation_id {
                let span = restriction.span;
                for day in span.days().chain(std::iter::once(span.end)) {
                    if let Some(slot) = reservation_map.get_mut(&day) {
                        // A checkout day legitimately hands over to the next
                        // stay's checkin; any other double-cover means the
                        // non-overlap invariant broke upstream.
                        if *slot != 0 && day != span.start {
                            double_cover(room_id, day, *slot, reservation_id);
                        }
                        *slot = reservation_id;
                    }
                }
            } else if let Some(slot) = block_map.get_mut(&restriction.span.start) {
                if *slot != 0 {
                    double_cover(room_id, restriction.span.start, *slot, restriction.id);
                }
                *slot = restriction.id;
            }
        }

        Ok(MonthCalendar {
            room_id,
            year,
            month,
            reservation_map,
            block_map,
        })
    }
}

/// Two restrictions covering one day is a broken invariant, not a display
/// choice: fail loudly in debug builds, keep the later write in release so
/// the admin calendar still renders.
fn double_cover(room_id: RoomId, day: NaiveDate, kept: i64, incoming: i64) {
    debug_assert!(
        false,
        "room {room_id}: day {day} covered twice ({kept} then {incoming})"
    );
    warn!("room {room_id}: day {day} covered twice ({kept} then {incoming}), keeping the later");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn month_span_inner_month() {
        let s = month_span(2025, 6).unwrap();
        assert_eq!(s.start, d(2025, 6, 1));
        assert_eq!(s.end, d(2025, 7, 1));
    }

    #[test]
    fn month_span_december_wraps_year() {
        let s = month_span(2025, 12).unwrap();
        assert_eq!(s.start, d(2025, 12, 1));
        assert_eq!(s.end, d(2026, 1, 1));
    }

    #[test]
    fn month_span_leap_february() {
        let s = month_span(2024, 2).unwrap();
        assert_eq!(s.days().count(), 29);
    }

    #[test]
    fn month_span_rejects_bad_month() {
        assert!(matches!(
            month_span(2025, 13),
            Err(Error::LimitExceeded(_))
        ));
        assert!(matches!(month_span(2025, 0), Err(Error::LimitExceeded(_))));
    }

    #[test]
    fn day_key_format_matches_source_layout() {
        let key = d(2025, 6, 3).format(DAY_KEY_FORMAT).to_string();
        assert_eq!(key, "06-03-2025");
    }
}
