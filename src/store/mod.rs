mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;

use crate::error::Error;
use crate::model::*;

/// Storage capability for rooms, reservations and their occupancy intervals.
///
/// Two implementations share this contract: [`PgStore`] (relational, the
/// production backend) and [`MemoryStore`] (deterministic fake for tests).
/// The contract every implementation upholds:
///
/// - restriction overlap is half-open and enforced *inside* the store's
///   per-room critical section, so two concurrent writers can never both
///   commit intervals that overlap;
/// - [`commit_booking`](ReservationStore::commit_booking) re-checks
///   availability and writes the reservation row plus its owning restriction
///   row as one atomic unit — on any failure nothing is visible;
/// - mutations on the same room are serialized; reads and mutations on other
///   rooms proceed concurrently;
/// - deleting a reservation cascade-deletes its restriction.
///
/// No other component writes reservation or restriction rows.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    // ── Room catalog ─────────────────────────────────────────

    async fn insert_room(&self, name: &str) -> Result<Room, Error>;

    async fn room(&self, id: RoomId) -> Result<Room, Error>;

    /// The full catalog, ordered by id. Callers depend on the ordering being
    /// stable across calls.
    async fn rooms(&self) -> Result<Vec<Room>, Error>;

    // ── Restrictions ─────────────────────────────────────────

    /// All restrictions for `room_id` intersecting the half-open `span`,
    /// ordered by start date. Unknown rooms yield an empty list; whether a
    /// room exists is the caller's question to ask.
    async fn restrictions_for_room_in_range(
        &self,
        room_id: RoomId,
        span: DateSpan,
    ) -> Result<Vec<RoomRestriction>, Error>;

    /// Insert one restriction, rejecting overlap with `Error::Conflict`.
    async fn insert_restriction(&self, new: NewRestriction) -> Result<RoomRestriction, Error>;

    async fn delete_restriction(&self, id: RestrictionId) -> Result<(), Error>;

    // ── Booking transaction ──────────────────────────────────

    /// Atomically re-check availability, persist the reservation and persist
    /// its reservation-backed restriction. The conflict check and both writes
    /// happen under one per-room critical section.
    async fn commit_booking(&self, new: NewReservation) -> Result<Reservation, Error>;

    // ── Reservation admin ────────────────────────────────────

    async fn reservation(&self, id: ReservationId) -> Result<Reservation, Error>;

    /// Reservations matching `filter`, ordered by start date.
    async fn reservations(&self, filter: ReservationFilter) -> Result<Vec<Reservation>, Error>;

    async fn update_guest(&self, id: ReservationId, guest: GuestContact) -> Result<(), Error>;

    async fn set_processed(&self, id: ReservationId, processed: bool) -> Result<(), Error>;

    /// Delete the reservation and its owning restriction.
    async fn delete_reservation(&self, id: ReservationId) -> Result<(), Error>;
}
