//! Rate limiting logic and state management.

mod counter;
mod key;
mod limiter;
mod store;

pub use counter::{AdmitOutcome, CounterEntry, Decision};
pub use key::{ClientKey, KeyResolver};
pub use limiter::{CheckOutcome, RateLimiter};
pub use store::{CounterStore, FixedWindowStore};
