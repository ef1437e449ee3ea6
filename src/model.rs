use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Relational serial keys — the only id types.
pub type RoomId = i64;
pub type ReservationId = i64;
pub type RestrictionId = i64;

/// Half-open date interval `[start, end)`.
///
/// The checkout day equals the next guest's checkin day without conflict, so
/// every overlap test in the crate goes through [`DateSpan::overlaps`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DateSpan {
    #[sqlx(rename = "start_date")]
    pub start: NaiveDate,
    #[sqlx(rename = "end_date")]
    pub end: NaiveDate,
}

impl DateSpan {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        debug_assert!(start < end, "DateSpan start must be before end");
        Self { start, end }
    }

    /// The one-night span starting at `day`. `None` only at the far edge of
    /// the calendar, where the following day is unrepresentable.
    pub fn single_day(day: NaiveDate) -> Option<Self> {
        day.succ_opt().map(|next| Self { start: day, end: next })
    }

    pub fn nights(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn overlaps(&self, other: &DateSpan) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_day(&self, day: NaiveDate) -> bool {
        self.start <= day && day < self.end
    }

    /// Iterate the days of `[start, end)`.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        std::iter::successors(Some(self.start).filter(|d| *d < end), move |d| {
            d.succ_opt().filter(|n| *n < end)
        })
    }
}

/// A bookable room. Immutable once created; seeded by the surrounding
/// application through the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct GuestContact {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

/// A committed guest booking. Created only by the booking transaction;
/// `processed` is the admin triage flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Reservation {
    pub id: ReservationId,
    pub room_id: RoomId,
    #[sqlx(flatten)]
    pub span: DateSpan,
    #[sqlx(flatten)]
    pub guest: GuestContact,
    pub processed: bool,
}

/// A date-interval occupancy record — reservations and admin blocks are both
/// just restrictions. `reservation_id` is `None` for a manual block.
///
/// Invariant: for a fixed room, no two committed restrictions overlap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RoomRestriction {
    pub id: RestrictionId,
    pub room_id: RoomId,
    #[sqlx(flatten)]
    pub span: DateSpan,
    pub reservation_id: Option<ReservationId>,
}

impl RoomRestriction {
    pub fn is_block(&self) -> bool {
        self.reservation_id.is_none()
    }

    pub fn is_reservation(&self) -> bool {
        self.reservation_id.is_some()
    }
}

// ── Insert payloads ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct NewReservation {
    pub room_id: RoomId,
    pub span: DateSpan,
    pub guest: GuestContact,
}

#[derive(Debug, Clone, Copy)]
pub struct NewRestriction {
    pub room_id: RoomId,
    pub span: DateSpan,
    pub reservation_id: Option<ReservationId>,
}

/// Admin listing filter for reservations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationFilter {
    All,
    /// Only reservations nobody has triaged yet.
    Unprocessed,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn span_basics() {
        let s = DateSpan::new(d(2025, 6, 10), d(2025, 6, 12));
        assert_eq!(s.nights(), 2);
        assert!(s.contains_day(d(2025, 6, 10)));
        assert!(s.contains_day(d(2025, 6, 11)));
        assert!(!s.contains_day(d(2025, 6, 12))); // half-open
    }

    #[test]
    fn span_overlap() {
        let a = DateSpan::new(d(2025, 1, 1), d(2025, 1, 5));
        let b = DateSpan::new(d(2025, 1, 4), d(2025, 1, 8));
        let c = DateSpan::new(d(2025, 1, 5), d(2025, 1, 10));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c)); // adjacent, not overlapping
    }

    #[test]
    fn span_days_iterates_half_open() {
        let s = DateSpan::new(d(2025, 2, 27), d(2025, 3, 2));
        let days: Vec<_> = s.days().collect();
        // 2025 is not a leap year
        assert_eq!(days, vec![d(2025, 2, 27), d(2025, 2, 28), d(2025, 3, 1)]);
    }

    #[test]
    fn single_day_span() {
        let s = DateSpan::single_day(d(2025, 7, 25)).unwrap();
        assert_eq!(s.nights(), 1);
        assert!(s.contains_day(d(2025, 7, 25)));
        assert!(!s.contains_day(d(2025, 7, 26)));
    }

    #[test]
    fn year_boundary_days() {
        let s = DateSpan::new(d(2024, 12, 31), d(2025, 1, 2));
        let days: Vec<_> = s.days().collect();
        assert_eq!(days, vec![d(2024, 12, 31), d(2025, 1, 1)]);
    }

    #[test]
    fn reservation_serialization_roundtrip() {
        let res = Reservation {
            id: 7,
            room_id: 1,
            span: DateSpan::new(d(2025, 6, 10), d(2025, 6, 12)),
            guest: GuestContact {
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                email: "ada@example.com".into(),
                phone: "555-0100".into(),
            },
            processed: false,
        };
        let json = serde_json::to_string(&res).unwrap();
        let decoded: Reservation = serde_json::from_str(&json).unwrap();
        assert_eq!(res, decoded);
    }

    #[test]
    fn restriction_kind_helpers() {
        let block = RoomRestriction {
            id: 1,
            room_id: 1,
            span: DateSpan::new(d(2025, 7, 25), d(2025, 7, 26)),
            reservation_id: None,
        };
        assert!(block.is_block());
        assert!(!block.is_reservation());

        let backed = RoomRestriction {
            reservation_id: Some(9),
            ..block.clone()
        };
        assert!(backed.is_reservation());
    }
}
