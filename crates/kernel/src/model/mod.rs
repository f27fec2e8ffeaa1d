//! Domain records shared by the stores, the services, and the HTTP modules.

pub mod booking;
pub mod id;
pub mod property;
pub mod user;

pub use booking::{Booking, BookingStatus, NewBooking, StayRange};
pub use id::{BookingId, PropertyId, UserId};
pub use property::{Property, PropertyFilter, PropertyStatus};
pub use user::{Role, User, UserRecord};
