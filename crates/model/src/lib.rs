//! Entity types shared by the storage layer and the reservation services
//! (§3), plus the hashing and month/day-arithmetic helpers the original
//! system used to keep keys small and dates simple (§9, GLOSSARY).

pub mod date;
pub mod fixed_str;
pub mod hash;
pub mod order;
pub mod station;
pub mod train;
pub mod user;

pub use date::{DateError, DayMinutes, MonthDay, Timestamp};
pub use fixed_str::{FixedStr, FixedStrError};
pub use order::{Order, OrderStatus};
pub use station::Station;
pub use train::Train;
pub use user::User;
