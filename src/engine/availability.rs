use std::time::Instant;

use crate::error::Error;
use crate::limits::MAX_QUERY_WINDOW_DAYS;
use crate::model::{DateSpan, Room, RoomId};
use crate::observability;

use super::Engine;

/// Reject empty/inverted spans before anything touches the store.
pub(crate) fn validate_span(span: &DateSpan) -> Result<(), Error> {
    if span.start >= span.end {
        return Err(Error::InvalidRange {
            start: span.start,
            end: span.end,
        });
    }
    Ok(())
}

pub(crate) fn validate_query_window(span: &DateSpan) -> Result<(), Error> {
    validate_span(span)?;
    if span.nights() > MAX_QUERY_WINDOW_DAYS {
        return Err(Error::LimitExceeded("query window too wide"));
    }
    Ok(())
}

impl Engine {
    /// Is the room free for the whole of `[span.start, span.end)`?
    ///
    /// Free means the range query returns no restrictions. A restriction
    /// ending exactly on `span.start` does not count: the checkout day is
    /// bookable as the next guest's checkin day.
    pub async fn is_room_free(&self, room_id: RoomId, span: DateSpan) -> Result<bool, Error> {
        validate_query_window(&span)?;
        self.store.room(room_id).await?;

        let started = Instant::now();
        let hits = self
            .store
            .restrictions_for_room_in_range(room_id, span)
            .await?;
        metrics::counter!(observability::AVAILABILITY_QUERIES_TOTAL).increment(1);
        metrics::histogram!(observability::AVAILABILITY_QUERY_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        Ok(hits.is_empty())
    }

    /// Every room in the catalog that is free for the whole span, in catalog
    /// order (ascending id). An empty result means "no availability" and is
    /// not an error.
    pub async fn free_rooms_in_range(&self, span: DateSpan) -> Result<Vec<Room>, Error> {
        validate_query_window(&span)?;

        let started = Instant::now();
        let mut free = Vec::new();
        for room in self.store.rooms().await? {
            let hits = self
                .store
                .restrictions_for_room_in_range(room.id, span)
                .await?;
            if hits.is_empty() {
                free.push(room);
            }
        }
        metrics::counter!(observability::AVAILABILITY_QUERIES_TOTAL).increment(1);
        metrics::histogram!(observability::AVAILABILITY_QUERY_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        Ok(free)
    }
}
