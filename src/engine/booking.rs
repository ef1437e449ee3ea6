use tracing::info;

use crate::error::{Error, FieldError};
use crate::limits::{MAX_FIELD_LEN, MAX_STAY_NIGHTS};
use crate::model::*;
use crate::observability;

use super::Engine;
use super::availability::validate_span;

/// A guest's booking request: room, dates, contact details.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub room_id: RoomId,
    pub span: DateSpan,
    pub guest: GuestContact,
}

/// Collect every guest-field problem in one pass so the caller can surface
/// them per form field.
pub(crate) fn validate_guest(guest: &GuestContact) -> Result<(), Error> {
    let mut errors = Vec::new();

    check_name(&mut errors, "first_name", &guest.first_name);
    check_name(&mut errors, "last_name", &guest.last_name);

    if guest.email.trim().is_empty() {
        errors.push(FieldError::new("email", "this field is required"));
    } else if !valid_email(&guest.email) {
        errors.push(FieldError::new("email", "not a valid email address"));
    }
    if guest.phone.len() > MAX_FIELD_LEN {
        errors.push(FieldError::new("phone", "too long"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(errors))
    }
}

fn check_name(errors: &mut Vec<FieldError>, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        errors.push(FieldError::new(field, "this field is required"));
    } else if value.trim().len() < 3 {
        errors.push(FieldError::new(field, "must be at least 3 characters"));
    } else if value.len() > MAX_FIELD_LEN {
        errors.push(FieldError::new(field, "too long"));
    }
}

/// `local@domain` with at least one dot inside the domain.
pub(crate) fn valid_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

impl Engine {
    /// Commit a reservation, or prove why it cannot be committed.
    ///
    /// Validation happens before any store access; the availability re-check
    /// and both row writes happen inside the store's per-room critical
    /// section, so of two concurrent requests for overlapping dates on one
    /// room, at most one ever succeeds. A `Conflict` is authoritative — the
    /// slot is genuinely taken and retrying won't help. `Storage` errors may
    /// be retried by the caller.
    pub async fn book_room(&self, request: BookingRequest) -> Result<Reservation, Error> {
        validate_span(&request.span)?;
        if request.span.nights() > MAX_STAY_NIGHTS {
            return Err(Error::LimitExceeded("stay too long"));
        }
        validate_guest(&request.guest)?;
        self.store.room(request.room_id).await?;

        let new = NewReservation {
            room_id: request.room_id,
            span: request.span,
            guest: request.guest,
        };
        match self.store.commit_booking(new).await {
            Ok(reservation) => {
                metrics::counter!(observability::BOOKINGS_TOTAL).increment(1);
                info!(
                    "booked room {} [{} → {}) as reservation {}",
                    reservation.room_id, reservation.span.start, reservation.span.end,
                    reservation.id
                );
                Ok(reservation)
            }
            Err(e @ Error::Conflict { .. }) => {
                metrics::counter!(observability::BOOKING_CONFLICTS_TOTAL).increment(1);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    // ── Admin triage ─────────────────────────────────────────

    pub async fn reservation(&self, id: ReservationId) -> Result<Reservation, Error> {
        self.store.reservation(id).await
    }

    pub async fn reservations(
        &self,
        filter: ReservationFilter,
    ) -> Result<Vec<Reservation>, Error> {
        self.store.reservations(filter).await
    }

    /// Admin edit of the guest contact fields, validated like a booking.
    pub async fn update_guest(&self, id: ReservationId, guest: GuestContact) -> Result<(), Error> {
        validate_guest(&guest)?;
        self.store.update_guest(id, guest).await
    }

    pub async fn set_processed(&self, id: ReservationId, processed: bool) -> Result<(), Error> {
        self.store.set_processed(id, processed).await
    }

    /// Admin cancel: removes the reservation and, with it, its occupying
    /// restriction — the dates open up again.
    pub async fn cancel_reservation(&self, id: ReservationId) -> Result<(), Error> {
        self.store.delete_reservation(id).await?;
        info!("cancelled reservation {id}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(valid_email("guest@example.com"));
        assert!(valid_email("a.b+c@mail.example.co.uk"));
        assert!(!valid_email("guest"));
        assert!(!valid_email("guest@"));
        assert!(!valid_email("@example.com"));
        assert!(!valid_email("guest@example"));
        assert!(!valid_email("guest@.com"));
        assert!(!valid_email("guest@example."));
        assert!(!valid_email("guest@ex@ample.com"));
    }

    #[test]
    fn guest_field_errors_are_collected() {
        let guest = GuestContact {
            first_name: "".into(),
            last_name: "Jo".into(),
            email: "not-an-email".into(),
            phone: "555-0100".into(),
        };
        let err = validate_guest(&guest).unwrap_err();
        let Error::Validation(errors) = err else {
            panic!("expected validation error");
        };
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["first_name", "last_name", "email"]);
    }

    #[test]
    fn valid_guest_passes() {
        let guest = GuestContact {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            phone: "".into(), // phone is optional
        };
        assert!(validate_guest(&guest).is_ok());
    }
}
