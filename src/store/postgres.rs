use async_trait::async_trait;
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};

use crate::config::PgConfig;
use crate::error::Error;
use crate::model::*;

use super::ReservationStore;

/// Column lists shared across queries to avoid repetition.
const RESTRICTION_COLUMNS: &str = "id, room_id, start_date, end_date, reservation_id";
const RESERVATION_COLUMNS: &str =
    "id, room_id, start_date, end_date, first_name, last_name, email, phone, processed";

/// Relational [`ReservationStore`] backed by Postgres.
///
/// Every mutation runs in a transaction that first takes the room's row lock
/// (`SELECT … FOR UPDATE`), which serializes writers per room exactly like
/// the in-memory store's write guard. The schema's exclusion constraint on
/// `(room_id, daterange)` backstops the overlap check at the write boundary,
/// so even a writer that bypassed the row lock could not commit an overlap.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(cfg: &PgConfig) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(cfg.max_connections)
            .acquire_timeout(cfg.acquire_timeout)
            .connect(&cfg.database_url)
            .await
            .map_err(storage)?;
        Ok(Self { pool })
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), Error> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Storage(e.to_string()))
    }

    /// Take the room's row lock, serializing writers for this room until the
    /// surrounding transaction ends.
    async fn lock_room(conn: &mut PgConnection, room_id: RoomId) -> Result<(), Error> {
        let row = sqlx::query("SELECT id FROM rooms WHERE id = $1 FOR UPDATE")
            .bind(room_id)
            .fetch_optional(conn)
            .await
            .map_err(storage)?;
        match row {
            Some(_) => Ok(()),
            None => Err(Error::not_found("room", room_id)),
        }
    }

    async fn overlap_exists(
        conn: &mut PgConnection,
        room_id: RoomId,
        span: &DateSpan,
    ) -> Result<bool, Error> {
        let hit = sqlx::query(
            "SELECT 1 FROM room_restrictions
             WHERE room_id = $1 AND start_date < $3 AND end_date > $2
             LIMIT 1",
        )
        .bind(room_id)
        .bind(span.start)
        .bind(span.end)
        .fetch_optional(conn)
        .await
        .map_err(storage)?;
        Ok(hit.is_some())
    }
}

fn storage(e: sqlx::Error) -> Error {
    Error::Storage(e.to_string())
}

/// Map write failures, folding exclusion/unique violations into `Conflict` —
/// they mean the schema-level overlap guard fired first.
fn write_err(e: sqlx::Error, room_id: RoomId) -> Error {
    if let Some(db) = e.as_database_error()
        && matches!(db.code().as_deref(), Some("23P01") | Some("23505"))
    {
        return Error::Conflict { room_id };
    }
    storage(e)
}

#[async_trait]
impl ReservationStore for PgStore {
    async fn insert_room(&self, name: &str) -> Result<Room, Error> {
        sqlx::query_as::<_, Room>("INSERT INTO rooms (name) VALUES ($1) RETURNING id, name")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(storage)
    }

    async fn room(&self, id: RoomId) -> Result<Room, Error> {
        sqlx::query_as::<_, Room>("SELECT id, name FROM rooms WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?
            .ok_or_else(|| Error::not_found("room", id))
    }

    async fn rooms(&self) -> Result<Vec<Room>, Error> {
        sqlx::query_as::<_, Room>("SELECT id, name FROM rooms ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(storage)
    }

    async fn restrictions_for_room_in_range(
        &self,
        room_id: RoomId,
        span: DateSpan,
    ) -> Result<Vec<RoomRestriction>, Error> {
        let query = format!(
            "SELECT {RESTRICTION_COLUMNS} FROM room_restrictions
             WHERE room_id = $1 AND start_date < $3 AND end_date > $2
             ORDER BY start_date"
        );
        sqlx::query_as::<_, RoomRestriction>(&query)
            .bind(room_id)
            .bind(span.start)
            .bind(span.end)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)
    }

    async fn insert_restriction(&self, new: NewRestriction) -> Result<RoomRestriction, Error> {
        let mut tx = self.pool.begin().await.map_err(storage)?;
        Self::lock_room(&mut tx, new.room_id).await?;
        if Self::overlap_exists(&mut tx, new.room_id, &new.span).await? {
            return Err(Error::Conflict {
                room_id: new.room_id,
            });
        }
        let query = format!(
            "INSERT INTO room_restrictions (room_id, start_date, end_date, reservation_id)
             VALUES ($1, $2, $3, $4)
             RETURNING {RESTRICTION_COLUMNS}"
        );
        let restriction = sqlx::query_as::<_, RoomRestriction>(&query)
            .bind(new.room_id)
            .bind(new.span.start)
            .bind(new.span.end)
            .bind(new.reservation_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| write_err(e, new.room_id))?;
        tx.commit().await.map_err(storage)?;
        Ok(restriction)
    }

    async fn delete_restriction(&self, id: RestrictionId) -> Result<(), Error> {
        let result = sqlx::query("DELETE FROM room_restrictions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("restriction", id));
        }
        Ok(())
    }

    async fn commit_booking(&self, new: NewReservation) -> Result<Reservation, Error> {
        // Dropping the transaction on error or cancellation rolls back, so a
        // reservation row is never visible without its restriction row.
        let mut tx = self.pool.begin().await.map_err(storage)?;
        Self::lock_room(&mut tx, new.room_id).await?;
        if Self::overlap_exists(&mut tx, new.room_id, &new.span).await? {
            return Err(Error::Conflict {
                room_id: new.room_id,
            });
        }
        let query = format!(
            "INSERT INTO reservations
                 (room_id, start_date, end_date, first_name, last_name, email, phone)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {RESERVATION_COLUMNS}"
        );
        let reservation = sqlx::query_as::<_, Reservation>(&query)
            .bind(new.room_id)
            .bind(new.span.start)
            .bind(new.span.end)
            .bind(&new.guest.first_name)
            .bind(&new.guest.last_name)
            .bind(&new.guest.email)
            .bind(&new.guest.phone)
            .fetch_one(&mut *tx)
            .await
            .map_err(storage)?;
        sqlx::query(
            "INSERT INTO room_restrictions (room_id, start_date, end_date, reservation_id)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(new.room_id)
        .bind(new.span.start)
        .bind(new.span.end)
        .bind(reservation.id)
        .execute(&mut *tx)
        .await
        .map_err(|e| write_err(e, new.room_id))?;
        tx.commit().await.map_err(storage)?;
        Ok(reservation)
    }

    async fn reservation(&self, id: ReservationId) -> Result<Reservation, Error> {
        let query = format!("SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1");
        sqlx::query_as::<_, Reservation>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?
            .ok_or_else(|| Error::not_found("reservation", id))
    }

    async fn reservations(&self, filter: ReservationFilter) -> Result<Vec<Reservation>, Error> {
        let query = match filter {
            ReservationFilter::All => format!(
                "SELECT {RESERVATION_COLUMNS} FROM reservations ORDER BY start_date, id"
            ),
            ReservationFilter::Unprocessed => format!(
                "SELECT {RESERVATION_COLUMNS} FROM reservations
                 WHERE NOT processed ORDER BY start_date, id"
            ),
        };
        sqlx::query_as::<_, Reservation>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)
    }

    async fn update_guest(&self, id: ReservationId, guest: GuestContact) -> Result<(), Error> {
        let result = sqlx::query(
            "UPDATE reservations
             SET first_name = $2, last_name = $3, email = $4, phone = $5
             WHERE id = $1",
        )
        .bind(id)
        .bind(&guest.first_name)
        .bind(&guest.last_name)
        .bind(&guest.email)
        .bind(&guest.phone)
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("reservation", id));
        }
        Ok(())
    }

    async fn set_processed(&self, id: ReservationId, processed: bool) -> Result<(), Error> {
        let result = sqlx::query("UPDATE reservations SET processed = $2 WHERE id = $1")
            .bind(id)
            .bind(processed)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("reservation", id));
        }
        Ok(())
    }

    async fn delete_reservation(&self, id: ReservationId) -> Result<(), Error> {
        // The restriction's FK is ON DELETE CASCADE; one statement removes both.
        let result = sqlx::query("DELETE FROM reservations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("reservation", id));
        }
        Ok(())
    }
}
