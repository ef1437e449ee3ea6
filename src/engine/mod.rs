mod availability;
mod blocks;
mod booking;
mod calendar;
mod drafts;

pub use blocks::{BlockDeltas, BlockEditReport};
pub use booking::BookingRequest;
pub use calendar::{DAY_KEY_FORMAT, DayEntry, MonthCalendar};
pub use drafts::{DraftToken, ReservationDraft};

use std::sync::Arc;
use std::time::Duration;

use crate::limits::DRAFT_TTL;
use crate::store::ReservationStore;

use drafts::DraftBox;

/// Front door of the core: availability queries, booking commits, calendar
/// projection, block edits and reservation drafts, all over one explicit
/// store handle. Construct it once and share it by reference; there is no
/// ambient global.
pub struct Engine {
    store: Arc<dyn ReservationStore>,
    drafts: DraftBox,
}

impl Engine {
    pub fn new(store: Arc<dyn ReservationStore>) -> Self {
        Self::with_draft_ttl(store, DRAFT_TTL)
    }

    pub fn with_draft_ttl(store: Arc<dyn ReservationStore>, draft_ttl: Duration) -> Self {
        Self {
            store,
            drafts: DraftBox::new(draft_ttl),
        }
    }

    /// The underlying store, e.g. for seeding rooms.
    pub fn store(&self) -> &dyn ReservationStore {
        self.store.as_ref()
    }
}
