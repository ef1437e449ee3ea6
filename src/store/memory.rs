use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::RwLock;

use crate::error::Error;
use crate::model::*;

use super::ReservationStore;

type SharedSlots = Arc<RwLock<RoomSlots>>;

/// Sorted occupancy intervals for one room. All mutation happens under the
/// room's write guard, which is what serializes concurrent bookers.
#[derive(Debug, Default)]
struct RoomSlots {
    /// Restrictions sorted by `span.start`.
    restrictions: Vec<RoomRestriction>,
}

impl RoomSlots {
    /// Insert keeping sort order by span start.
    fn insert_sorted(&mut self, restriction: RoomRestriction) {
        let pos = self
            .restrictions
            .binary_search_by_key(&restriction.span.start, |r| r.span.start)
            .unwrap_or_else(|e| e);
        self.restrictions.insert(pos, restriction);
    }

    fn remove(&mut self, id: RestrictionId) -> Option<RoomRestriction> {
        let pos = self.restrictions.iter().position(|r| r.id == id)?;
        Some(self.restrictions.remove(pos))
    }

    /// Restrictions overlapping the query window. Binary search skips
    /// everything starting at or after `query.end`.
    fn overlapping(&self, query: &DateSpan) -> impl Iterator<Item = &RoomRestriction> {
        let right_bound = self
            .restrictions
            .partition_point(|r| r.span.start < query.end);
        self.restrictions[..right_bound]
            .iter()
            .filter(move |r| r.span.end > query.start)
    }

    fn first_conflict(&self, span: &DateSpan) -> Option<&RoomRestriction> {
        self.overlapping(span).next()
    }
}

/// In-memory [`ReservationStore`]: deterministic, non-durable, intended for
/// tests and local development. Per-room `RwLock`s take the place of the
/// relational store's row locks.
pub struct MemoryStore {
    rooms: DashMap<RoomId, Room>,
    slots: DashMap<RoomId, SharedSlots>,
    reservations: DashMap<ReservationId, Reservation>,
    /// Reverse lookup: restriction id → room id.
    restriction_rooms: DashMap<RestrictionId, RoomId>,
    next_room: AtomicI64,
    next_reservation: AtomicI64,
    next_restriction: AtomicI64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
            slots: DashMap::new(),
            reservations: DashMap::new(),
            restriction_rooms: DashMap::new(),
            next_room: AtomicI64::new(1),
            next_reservation: AtomicI64::new(1),
            next_restriction: AtomicI64::new(1),
        }
    }

    fn slots_for(&self, room_id: RoomId) -> Result<SharedSlots, Error> {
        self.slots
            .get(&room_id)
            .map(|e| e.value().clone())
            .ok_or_else(|| Error::not_found("room", room_id))
    }
}

#[async_trait]
impl ReservationStore for MemoryStore {
    async fn insert_room(&self, name: &str) -> Result<Room, Error> {
        let room = Room {
            id: self.next_room.fetch_add(1, Ordering::Relaxed),
            name: name.to_string(),
        };
        self.slots.insert(room.id, Arc::default());
        self.rooms.insert(room.id, room.clone());
        Ok(room)
    }

    async fn room(&self, id: RoomId) -> Result<Room, Error> {
        self.rooms
            .get(&id)
            .map(|e| e.value().clone())
            .ok_or_else(|| Error::not_found("room", id))
    }

    async fn rooms(&self) -> Result<Vec<Room>, Error> {
        let mut rooms: Vec<Room> = self.rooms.iter().map(|e| e.value().clone()).collect();
        rooms.sort_by_key(|r| r.id);
        Ok(rooms)
    }

    async fn restrictions_for_room_in_range(
        &self,
        room_id: RoomId,
        span: DateSpan,
    ) -> Result<Vec<RoomRestriction>, Error> {
        let Some(slots) = self.slots.get(&room_id).map(|e| e.value().clone()) else {
            return Ok(Vec::new());
        };
        let guard = slots.read().await;
        Ok(guard.overlapping(&span).cloned().collect())
    }

    async fn insert_restriction(&self, new: NewRestriction) -> Result<RoomRestriction, Error> {
        let slots = self.slots_for(new.room_id)?;
        let mut guard = slots.write().await;
        if guard.first_conflict(&new.span).is_some() {
            return Err(Error::Conflict {
                room_id: new.room_id,
            });
        }
        let restriction = RoomRestriction {
            id: self.next_restriction.fetch_add(1, Ordering::Relaxed),
            room_id: new.room_id,
            span: new.span,
            reservation_id: new.reservation_id,
        };
        guard.insert_sorted(restriction.clone());
        self.restriction_rooms.insert(restriction.id, new.room_id);
        Ok(restriction)
    }

    async fn delete_restriction(&self, id: RestrictionId) -> Result<(), Error> {
        let room_id = self
            .restriction_rooms
            .get(&id)
            .map(|e| *e.value())
            .ok_or_else(|| Error::not_found("restriction", id))?;
        let slots = self.slots_for(room_id)?;
        let mut guard = slots.write().await;
        match guard.remove(id) {
            Some(_) => {
                self.restriction_rooms.remove(&id);
                Ok(())
            }
            None => Err(Error::not_found("restriction", id)),
        }
    }

    async fn commit_booking(&self, new: NewReservation) -> Result<Reservation, Error> {
        let slots = self.slots_for(new.room_id)?;
        // The write guard spans the conflict re-check and both inserts; there
        // is no await between the first write and the last, so cancellation
        // cannot leave partial state behind.
        let mut guard = slots.write().await;
        if guard.first_conflict(&new.span).is_some() {
            return Err(Error::Conflict {
                room_id: new.room_id,
            });
        }
        let reservation = Reservation {
            id: self.next_reservation.fetch_add(1, Ordering::Relaxed),
            room_id: new.room_id,
            span: new.span,
            guest: new.guest,
            processed: false,
        };
        let restriction = RoomRestriction {
            id: self.next_restriction.fetch_add(1, Ordering::Relaxed),
            room_id: new.room_id,
            span: new.span,
            reservation_id: Some(reservation.id),
        };
        guard.insert_sorted(restriction.clone());
        self.restriction_rooms.insert(restriction.id, new.room_id);
        self.reservations.insert(reservation.id, reservation.clone());
        Ok(reservation)
    }

    async fn reservation(&self, id: ReservationId) -> Result<Reservation, Error> {
        self.reservations
            .get(&id)
            .map(|e| e.value().clone())
            .ok_or_else(|| Error::not_found("reservation", id))
    }

    async fn reservations(&self, filter: ReservationFilter) -> Result<Vec<Reservation>, Error> {
        let mut out: Vec<Reservation> = self
            .reservations
            .iter()
            .map(|e| e.value().clone())
            .filter(|r| match filter {
                ReservationFilter::All => true,
                ReservationFilter::Unprocessed => !r.processed,
            })
            .collect();
        out.sort_by_key(|r| (r.span.start, r.id));
        Ok(out)
    }

    async fn update_guest(&self, id: ReservationId, guest: GuestContact) -> Result<(), Error> {
        match self.reservations.get_mut(&id) {
            Some(mut e) => {
                e.guest = guest;
                Ok(())
            }
            None => Err(Error::not_found("reservation", id)),
        }
    }

    async fn set_processed(&self, id: ReservationId, processed: bool) -> Result<(), Error> {
        match self.reservations.get_mut(&id) {
            Some(mut e) => {
                e.processed = processed;
                Ok(())
            }
            None => Err(Error::not_found("reservation", id)),
        }
    }

    async fn delete_reservation(&self, id: ReservationId) -> Result<(), Error> {
        let room_id = self
            .reservations
            .get(&id)
            .map(|e| e.room_id)
            .ok_or_else(|| Error::not_found("reservation", id))?;
        let slots = self.slots_for(room_id)?;
        let mut guard = slots.write().await;
        // Cascade: drop the owning restriction first, then the row.
        if let Some(pos) = guard
            .restrictions
            .iter()
            .position(|r| r.reservation_id == Some(id))
        {
            let removed = guard.restrictions.remove(pos);
            self.restriction_rooms.remove(&removed.id);
        }
        self.reservations.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn span(s: (i32, u32, u32), e: (i32, u32, u32)) -> DateSpan {
        DateSpan::new(d(s.0, s.1, s.2), d(e.0, e.1, e.2))
    }

    fn block(room_id: RoomId, s: (i32, u32, u32), e: (i32, u32, u32)) -> NewRestriction {
        NewRestriction {
            room_id,
            span: span(s, e),
            reservation_id: None,
        }
    }

    #[tokio::test]
    async fn restrictions_kept_sorted_by_start() {
        let store = MemoryStore::new();
        let room = store.insert_room("Suite").await.unwrap();

        store
            .insert_restriction(block(room.id, (2025, 3, 20), (2025, 3, 22)))
            .await
            .unwrap();
        store
            .insert_restriction(block(room.id, (2025, 3, 1), (2025, 3, 3)))
            .await
            .unwrap();
        store
            .insert_restriction(block(room.id, (2025, 3, 10), (2025, 3, 12)))
            .await
            .unwrap();

        let all = store
            .restrictions_for_room_in_range(room.id, span((2025, 3, 1), (2025, 4, 1)))
            .await
            .unwrap();
        let starts: Vec<_> = all.iter().map(|r| r.span.start).collect();
        assert_eq!(starts, vec![d(2025, 3, 1), d(2025, 3, 10), d(2025, 3, 20)]);
    }

    #[tokio::test]
    async fn range_query_excludes_adjacent() {
        let store = MemoryStore::new();
        let room = store.insert_room("Suite").await.unwrap();
        store
            .insert_restriction(block(room.id, (2025, 1, 1), (2025, 1, 5)))
            .await
            .unwrap();

        // Query starting exactly at the restriction's end sees nothing.
        let hits = store
            .restrictions_for_room_in_range(room.id, span((2025, 1, 5), (2025, 1, 10)))
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn overlapping_insert_rejected() {
        let store = MemoryStore::new();
        let room = store.insert_room("Suite").await.unwrap();
        store
            .insert_restriction(block(room.id, (2025, 1, 1), (2025, 1, 5)))
            .await
            .unwrap();

        let result = store
            .insert_restriction(block(room.id, (2025, 1, 4), (2025, 1, 6)))
            .await;
        assert!(matches!(result, Err(Error::Conflict { .. })));
    }

    #[tokio::test]
    async fn insert_into_unknown_room_not_found() {
        let store = MemoryStore::new();
        let result = store.insert_restriction(block(99, (2025, 1, 1), (2025, 1, 2))).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
    }

    #[tokio::test]
    async fn delete_restriction_twice_not_found() {
        let store = MemoryStore::new();
        let room = store.insert_room("Suite").await.unwrap();
        let r = store
            .insert_restriction(block(room.id, (2025, 1, 1), (2025, 1, 2)))
            .await
            .unwrap();

        store.delete_restriction(r.id).await.unwrap();
        let again = store.delete_restriction(r.id).await;
        assert!(matches!(again, Err(Error::NotFound { .. })));
    }

    #[tokio::test]
    async fn rooms_ordered_by_id() {
        let store = MemoryStore::new();
        let a = store.insert_room("General's Quarters").await.unwrap();
        let b = store.insert_room("Major's Suite").await.unwrap();
        let c = store.insert_room("Colonel's Den").await.unwrap();

        let rooms = store.rooms().await.unwrap();
        let ids: Vec<_> = rooms.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![a.id, b.id, c.id]);
    }
}
