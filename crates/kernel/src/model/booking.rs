use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::id::{BookingId, PropertyId, UserId};

/// Half-open night range `[check_in, check_out)`.
///
/// A stay checking out on day D and another checking in on day D share no
/// night, so they do not overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StayRange {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

impl StayRange {
    /// Returns `None` unless `check_in < check_out`.
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Option<Self> {
        (check_in < check_out).then_some(Self {
            check_in,
            check_out,
        })
    }

    pub fn check_in(&self) -> NaiveDate {
        self.check_in
    }

    pub fn check_out(&self) -> NaiveDate {
        self.check_out
    }

    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    pub fn overlaps(&self, other: &StayRange) -> bool {
        self.check_in < other.check_out && other.check_in < self.check_out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    /// Active bookings hold their nights; the non-overlap invariant covers only these.
    pub fn is_active(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Confirmed)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
                | (BookingStatus::Confirmed, BookingStatus::Cancelled)
                | (BookingStatus::Confirmed, BookingStatus::Completed)
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reservation of one property for a stay range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub property_id: PropertyId,
    pub requester_id: UserId,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub status: BookingStatus,
    pub total_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn stay(&self) -> StayRange {
        StayRange {
            check_in: self.check_in,
            check_out: self.check_out,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// Booking request as handed to the ledger, which assigns the id and the Pending status.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub property_id: PropertyId,
    pub requester_id: UserId,
    pub stay: StayRange,
    pub total_price: f64,
    pub idempotency_key: Option<String>,
    pub requested_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    #[test]
    fn stay_range_requires_check_in_before_check_out() {
        assert!(StayRange::new(day(5), day(5)).is_none());
        assert!(StayRange::new(day(6), day(5)).is_none());
        assert_eq!(StayRange::new(day(1), day(5)).unwrap().nights(), 4);
    }

    #[test]
    fn touching_ranges_do_not_overlap() {
        let first = StayRange::new(day(1), day(5)).unwrap();
        let touching = StayRange::new(day(5), day(8)).unwrap();
        let crossing = StayRange::new(day(4), day(8)).unwrap();
        let inside = StayRange::new(day(2), day(3)).unwrap();

        assert!(!first.overlaps(&touching));
        assert!(!touching.overlaps(&first));
        assert!(first.overlaps(&crossing));
        assert!(first.overlaps(&inside));
        assert!(inside.overlaps(&first));
    }

    #[test]
    fn terminal_states_stay_terminal() {
        use BookingStatus::*;
        for next in [Pending, Confirmed, Cancelled, Completed] {
            assert!(!Cancelled.can_transition_to(next));
            assert!(!Completed.can_transition_to(next));
        }
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Confirmed.can_transition_to(Pending));
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&BookingStatus::Confirmed).unwrap();
        assert_eq!(json, "\"confirmed\"");
    }
}
