//! Storage seams. The db crate provides the implementations.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::StoreResult;
use crate::model::{
    Booking, BookingId, BookingStatus, NewBooking, Property, PropertyFilter, PropertyId, StayRange,
    User, UserId, UserRecord,
};

#[async_trait]
pub trait PropertyStore: Send + Sync {
    async fn get(&self, id: PropertyId) -> StoreResult<Property>;

    async fn exists(&self, id: PropertyId) -> bool;

    /// Matching properties, newest first.
    async fn list(&self, filter: &PropertyFilter) -> StoreResult<Vec<Property>>;

    async fn insert(&self, property: Property) -> StoreResult<Property>;

    async fn update(&self, property: Property) -> StoreResult<Property>;

    async fn delete(&self, id: PropertyId) -> StoreResult<Property>;
}

/// Owner of every booking record and of the non-overlap invariant.
#[async_trait]
pub trait BookingLedger: Send + Sync {
    /// Active bookings of `property_id` sharing at least one night with `stay`.
    async fn find_overlapping(
        &self,
        property_id: PropertyId,
        stay: StayRange,
    ) -> StoreResult<Vec<Booking>>;

    /// Check-and-insert as one atomic step per property. Fails with
    /// `StoreError::Conflict` when an active booking overlaps.
    ///
    /// With an idempotency key, a repeat of the same requester's request
    /// (same property and stay) returns the stored booking; the same key with
    /// a different property or stay fails with `StoreError::IdempotencyKeyReused`.
    async fn insert(&self, booking: NewBooking) -> StoreResult<Booking>;

    /// Apply a status transition stamped with `at`.
    async fn update_status(
        &self,
        id: BookingId,
        status: BookingStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<Booking>;

    async fn get(&self, id: BookingId) -> StoreResult<Booking>;

    /// Newest first.
    async fn list_by_requester(&self, requester_id: UserId) -> StoreResult<Vec<Booking>>;

    /// Newest first.
    async fn list_by_property(&self, property_id: PropertyId) -> StoreResult<Vec<Booking>>;

    /// Newest first.
    async fn list_all(&self) -> StoreResult<Vec<Booking>>;

    /// Confirmed bookings whose checkout date is strictly before `today`.
    async fn due_for_completion(&self, today: NaiveDate) -> StoreResult<Vec<Booking>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `StoreError::Duplicate("email")` when the email is in use.
    async fn insert(&self, record: UserRecord) -> StoreResult<User>;

    async fn get(&self, id: UserId) -> StoreResult<UserRecord>;

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>>;

    /// Oldest first.
    async fn list(&self) -> StoreResult<Vec<User>>;

    async fn update(&self, record: UserRecord) -> StoreResult<User>;

    async fn delete(&self, id: UserId) -> StoreResult<User>;
}
