use chrono::NaiveDate;
use tracing::debug;

use crate::error::Error;
use crate::limits::MAX_BLOCK_BATCH;
use crate::model::{DateSpan, NewRestriction, RestrictionId, RoomId};
use crate::observability;

use super::Engine;

/// One calendar-edit submission: blocks to lift and days to block.
#[derive(Debug, Clone, Default)]
pub struct BlockDeltas {
    pub remove: Vec<RestrictionId>,
    pub add: Vec<NaiveDate>,
}

/// What a block edit actually did. `rejected` carries the per-date failures
/// that did not stop the rest of the submission.
#[derive(Debug, Default)]
pub struct BlockEditReport {
    pub removed: usize,
    pub added: Vec<(NaiveDate, RestrictionId)>,
    pub rejected: Vec<(NaiveDate, Error)>,
}

impl Engine {
    /// Apply an admin's calendar edit against the room's restrictions.
    ///
    /// Removals are idempotent — a block somebody already lifted is a no-op,
    /// not an error. Each addition is a one-day manual block; a date that
    /// collides with an existing restriction is reported in `rejected` while
    /// the remaining additions still commit. Storage failures abort the
    /// whole submission.
    pub async fn apply_block_deltas(
        &self,
        room_id: RoomId,
        deltas: BlockDeltas,
    ) -> Result<BlockEditReport, Error> {
        if deltas.remove.len() + deltas.add.len() > MAX_BLOCK_BATCH {
            return Err(Error::LimitExceeded("block batch too large"));
        }
        self.store.room(room_id).await?;

        let mut report = BlockEditReport::default();

        for id in deltas.remove {
            match self.store.delete_restriction(id).await {
                Ok(()) => report.removed += 1,
                Err(Error::NotFound { .. }) => {
                    debug!("block {id} already gone, skipping");
                }
                Err(e) => return Err(e),
            }
        }

        for day in deltas.add {
            let Some(span) = DateSpan::single_day(day) else {
                report
                    .rejected
                    .push((day, Error::LimitExceeded("day out of range")));
                continue;
            };
            let new = NewRestriction {
                room_id,
                span,
                reservation_id: None,
            };
            match self.store.insert_restriction(new).await {
                Ok(restriction) => report.added.push((day, restriction.id)),
                Err(e @ Error::Conflict { .. }) => report.rejected.push((day, e)),
                Err(e) => return Err(e),
            }
        }

        metrics::counter!(observability::BLOCK_EDITS_TOTAL).increment(1);
        Ok(report)
    }
}
