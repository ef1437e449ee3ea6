use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;
use ulid::Ulid;

use crate::error::{Error, FieldError};
use crate::model::{DateSpan, GuestContact, Reservation, RoomId};
use crate::observability;

use super::Engine;
use super::availability::validate_query_window;
use super::booking::BookingRequest;

/// Client-supplied key for an in-progress reservation.
pub type DraftToken = Ulid;

/// A reservation being assembled across requests: dates first, then a room,
/// then guest details at completion. Replaces the original flow's
/// session-carried draft with explicit, expiring state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationDraft {
    pub span: DateSpan,
    pub room_id: Option<RoomId>,
}

struct StoredDraft {
    draft: ReservationDraft,
    expires_at: Instant,
}

/// Token-keyed drafts with per-draft expiry. Expired entries answer as
/// missing and are physically dropped by `sweep`; there is no background
/// task — the embedding application owns scheduling.
pub(super) struct DraftBox {
    drafts: DashMap<DraftToken, StoredDraft>,
    ttl: Duration,
}

impl DraftBox {
    pub(super) fn new(ttl: Duration) -> Self {
        Self {
            drafts: DashMap::new(),
            ttl,
        }
    }

    fn put_at(&self, token: DraftToken, draft: ReservationDraft, now: Instant) {
        self.drafts.insert(
            token,
            StoredDraft {
                draft,
                expires_at: now + self.ttl,
            },
        );
        metrics::gauge!(observability::DRAFTS_ACTIVE).set(self.drafts.len() as f64);
    }

    fn get_at(&self, token: DraftToken, now: Instant) -> Option<ReservationDraft> {
        self.drafts
            .get(&token)
            .filter(|e| e.expires_at > now)
            .map(|e| e.draft)
    }

    /// Mutate a live draft in place. Returns false for missing or expired
    /// tokens; expired entries are left for the sweep.
    fn update_at(
        &self,
        token: DraftToken,
        now: Instant,
        f: impl FnOnce(&mut ReservationDraft),
    ) -> bool {
        if let Some(mut entry) = self.drafts.get_mut(&token)
            && entry.expires_at > now
        {
            f(&mut entry.draft);
            return true;
        }
        false
    }

    fn remove(&self, token: DraftToken) -> Option<ReservationDraft> {
        let removed = self.drafts.remove(&token).map(|(_, e)| e.draft);
        metrics::gauge!(observability::DRAFTS_ACTIVE).set(self.drafts.len() as f64);
        removed
    }

    /// Drop every expired draft, returning how many went.
    fn sweep_at(&self, now: Instant) -> usize {
        let before = self.drafts.len();
        self.drafts.retain(|_, e| e.expires_at > now);
        let swept = before - self.drafts.len();
        metrics::gauge!(observability::DRAFTS_ACTIVE).set(self.drafts.len() as f64);
        swept
    }
}

impl Engine {
    /// Start a draft for a date range under a client-supplied token. A
    /// second call with the same token restarts the draft (and its clock).
    pub fn begin_draft(&self, token: DraftToken, span: DateSpan) -> Result<(), Error> {
        validate_query_window(&span)?;
        self.drafts.put_at(
            token,
            ReservationDraft {
                span,
                room_id: None,
            },
            Instant::now(),
        );
        Ok(())
    }

    /// Attach a room choice to a live draft.
    pub async fn choose_room(&self, token: DraftToken, room_id: RoomId) -> Result<(), Error> {
        self.store.room(room_id).await?;
        if !self
            .drafts
            .update_at(token, Instant::now(), |d| d.room_id = Some(room_id))
        {
            return Err(Error::not_found("draft", token));
        }
        Ok(())
    }

    /// The live draft behind `token`, if any.
    pub fn draft(&self, token: DraftToken) -> Option<ReservationDraft> {
        self.drafts.get_at(token, Instant::now())
    }

    /// Book the drafted stay. The draft is discarded only on success, so a
    /// rejected completion (conflict, bad guest fields) can be corrected and
    /// retried under the same token.
    pub async fn complete_draft(
        &self,
        token: DraftToken,
        guest: GuestContact,
    ) -> Result<Reservation, Error> {
        let draft = self
            .drafts
            .get_at(token, Instant::now())
            .ok_or_else(|| Error::not_found("draft", token))?;
        let Some(room_id) = draft.room_id else {
            return Err(Error::Validation(vec![FieldError::new(
                "room_id",
                "no room chosen",
            )]));
        };
        let reservation = self
            .book_room(BookingRequest {
                room_id,
                span: draft.span,
                guest,
            })
            .await?;
        self.drafts.remove(token);
        Ok(reservation)
    }

    /// Drop a draft without booking. Returns whether one existed.
    pub fn abandon_draft(&self, token: DraftToken) -> bool {
        self.drafts.remove(token).is_some()
    }

    /// Drop expired drafts; returns how many were collected. Callers decide
    /// when to sweep — the engine runs no timers of its own.
    pub fn sweep_expired_drafts(&self) -> usize {
        let swept = self.drafts.sweep_at(Instant::now());
        if swept > 0 {
            debug!("swept {swept} expired drafts");
        }
        swept
    }
}
