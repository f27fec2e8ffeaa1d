//! Booking service: validates requests and coordinates the property store
//! with the booking ledger. It keeps no state of its own.

use std::sync::Arc;

use chrono::NaiveDate;
use staybook_authz::{policy, AuthzError, Identity};
use staybook_kernel::clock::Clock;
use staybook_kernel::error::StoreError;
use staybook_kernel::model::{
    Booking, BookingId, BookingStatus, NewBooking, Property, PropertyId, StayRange, UserId,
};
use staybook_kernel::repository::{BookingLedger, PropertyStore};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("invalid stay range: {0}")]
    InvalidRange(&'static str),

    #[error("property {0} does not exist or is not accepting bookings")]
    PropertyNotFound(PropertyId),

    #[error("stay overlaps booking {0}")]
    BookingConflict(BookingId),

    #[error("idempotency key already used for booking {0} with a different stay")]
    IdempotencyKeyReused(BookingId),

    #[error("stay total is out of range")]
    InvalidPrice,

    #[error("cannot move booking from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error(transparent)]
    Unauthorized(#[from] AuthzError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("storage failure")]
    Storage(#[source] StoreError),
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => BookingError::NotFound { entity, id },
            StoreError::Conflict(id) => BookingError::BookingConflict(id),
            StoreError::IdempotencyKeyReused(id) => BookingError::IdempotencyKeyReused(id),
            StoreError::InvalidTransition { from, to } => {
                BookingError::InvalidTransition { from, to }
            }
            other => BookingError::Storage(other),
        }
    }
}

/// A booking request as received at the service boundary.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub property_id: PropertyId,
    pub requester_id: UserId,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub idempotency_key: Option<String>,
}

pub struct BookingService {
    properties: Arc<dyn PropertyStore>,
    ledger: Arc<dyn BookingLedger>,
    clock: Arc<dyn Clock>,
}

impl BookingService {
    pub fn new(
        properties: Arc<dyn PropertyStore>,
        ledger: Arc<dyn BookingLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            properties,
            ledger,
            clock,
        }
    }

    /// Validate and commit a booking request. The new booking is Pending.
    ///
    /// A reversed or empty range fails before the property is looked up; a
    /// missing or inactive property fails before the past-date check.
    pub async fn request_booking(&self, request: BookingRequest) -> Result<Booking, BookingError> {
        let stay = StayRange::new(request.check_in, request.check_out)
            .ok_or(BookingError::InvalidRange("check-in must be before check-out"))?;

        let property = self.bookable_property(request.property_id).await?;

        if stay.check_in() < self.clock.today() {
            return Err(BookingError::InvalidRange("check-in is in the past"));
        }

        let total_price = property.price * stay.nights() as f64;
        if !total_price.is_finite() {
            return Err(BookingError::InvalidPrice);
        }

        let booking = self
            .ledger
            .insert(NewBooking {
                property_id: property.id,
                requester_id: request.requester_id,
                stay,
                total_price,
                idempotency_key: request.idempotency_key,
                requested_at: self.clock.now(),
            })
            .await?;

        tracing::info!(
            booking_id = %booking.id,
            property_id = %booking.property_id,
            requester_id = %booking.requester_id,
            check_in = %booking.check_in,
            check_out = %booking.check_out,
            "booking requested"
        );
        Ok(booking)
    }

    /// Accept a pending booking. Only the property owner may confirm.
    pub async fn confirm(
        &self,
        booking_id: BookingId,
        identity: &Identity,
    ) -> Result<Booking, BookingError> {
        let booking = self.ledger.get(booking_id).await?;
        let owner_id = self
            .owner_of(booking.property_id)
            .await?
            .ok_or(BookingError::PropertyNotFound(booking.property_id))?;
        policy::require_owner(identity, owner_id)?;

        let confirmed = self
            .ledger
            .update_status(booking_id, BookingStatus::Confirmed, self.clock.now())
            .await?;
        tracing::info!(booking_id = %booking_id, "booking confirmed");
        Ok(confirmed)
    }

    /// Withdraw or reject a booking. The requester or the property owner may cancel.
    pub async fn cancel(
        &self,
        booking_id: BookingId,
        identity: &Identity,
    ) -> Result<Booking, BookingError> {
        let booking = self.ledger.get(booking_id).await?;
        match self.owner_of(booking.property_id).await? {
            Some(owner_id) => policy::require_party(identity, booking.requester_id, owner_id)?,
            // Listing is gone; the requester can still withdraw.
            None if identity.user_id == booking.requester_id => {}
            None => {
                return Err(AuthzError::Forbidden("only the requester may cancel").into());
            }
        }

        let cancelled = self
            .ledger
            .update_status(booking_id, BookingStatus::Cancelled, self.clock.now())
            .await?;
        tracing::info!(
            booking_id = %booking_id,
            cancelled_by = %identity.user_id,
            "booking cancelled"
        );
        Ok(cancelled)
    }

    /// One booking, visible to its requester, the property owner, or an admin.
    pub async fn get(
        &self,
        booking_id: BookingId,
        identity: &Identity,
    ) -> Result<Booking, BookingError> {
        let booking = self.ledger.get(booking_id).await?;
        if identity.is_admin() || identity.user_id == booking.requester_id {
            return Ok(booking);
        }
        match self.owner_of(booking.property_id).await? {
            Some(owner_id) => {
                policy::require_party_or_admin(identity, booking.requester_id, owner_id)?
            }
            None => return Err(AuthzError::Forbidden("not a party to this booking").into()),
        }
        Ok(booking)
    }

    /// The caller's own bookings, newest first.
    pub async fn list_mine(&self, identity: &Identity) -> Result<Vec<Booking>, BookingError> {
        Ok(self.ledger.list_by_requester(identity.user_id).await?)
    }

    /// Every booking, newest first. Admin only.
    pub async fn list_all(&self, identity: &Identity) -> Result<Vec<Booking>, BookingError> {
        policy::require_admin(identity)?;
        Ok(self.ledger.list_all().await?)
    }

    /// Bookings of one property, for its owner or an admin.
    pub async fn list_for_property(
        &self,
        property_id: PropertyId,
        identity: &Identity,
    ) -> Result<Vec<Booking>, BookingError> {
        let owner_id = self
            .owner_of(property_id)
            .await?
            .ok_or(BookingError::PropertyNotFound(property_id))?;
        policy::require_owner_or_admin(identity, owner_id)?;
        Ok(self.ledger.list_by_property(property_id).await?)
    }

    /// Whether any Pending or Confirmed booking still holds nights on the property.
    pub async fn has_active_bookings(&self, property_id: PropertyId) -> Result<bool, BookingError> {
        let bookings = self.ledger.list_by_property(property_id).await?;
        Ok(bookings.iter().any(Booking::is_active))
    }

    /// Move every Confirmed booking whose checkout date has passed to
    /// Completed. The checkout day itself still belongs to the stay.
    /// Returns how many bookings were completed.
    pub async fn complete_elapsed(&self) -> Result<usize, BookingError> {
        let today = self.clock.today();
        let due = self.ledger.due_for_completion(today).await?;

        let mut completed = 0;
        for booking in due {
            match self
                .ledger
                .update_status(booking.id, BookingStatus::Completed, self.clock.now())
                .await
            {
                Ok(_) => completed += 1,
                // Cancelled between the scan and the update
                Err(StoreError::InvalidTransition { .. }) | Err(StoreError::NotFound { .. }) => {
                    tracing::debug!(booking_id = %booking.id, "completion skipped");
                }
                Err(e) => return Err(e.into()),
            }
        }

        if completed > 0 {
            tracing::info!(completed, %today, "completed elapsed bookings");
        }
        Ok(completed)
    }

    async fn bookable_property(&self, property_id: PropertyId) -> Result<Property, BookingError> {
        match self.properties.get(property_id).await {
            Ok(property) if property.is_bookable() => Ok(property),
            Ok(_) | Err(StoreError::NotFound { .. }) => {
                Err(BookingError::PropertyNotFound(property_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn owner_of(&self, property_id: PropertyId) -> Result<Option<UserId>, BookingError> {
        match self.properties.get(property_id).await {
            Ok(property) => Ok(Some(property.owner_id)),
            Err(StoreError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
