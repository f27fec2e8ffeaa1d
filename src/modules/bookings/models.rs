use chrono::NaiveDate;
use garde::Validate;
use serde::{Deserialize, Serialize};
use staybook_kernel::model::PropertyId;

/// Body of `POST /api/bookings`. Range rules are enforced by the booking service.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateBooking {
    #[garde(skip)]
    pub property_id: PropertyId,
    /// First night of the stay
    #[garde(skip)]
    pub check_in: NaiveDate,
    /// Departure day; the night before it is the last one booked
    #[garde(skip)]
    pub check_out: NaiveDate,
}

/// Longest `Idempotency-Key` header value accepted.
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 255;
