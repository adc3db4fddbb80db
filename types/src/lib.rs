//! Fundamental types for TronGuard.
//!
//! Every other crate in the workspace speaks in these types: validated TRON
//! addresses and the role they play in a resource lease, bounded free-text
//! reasons, the numeric identity of whoever caused a mutation, and
//! timestamps.

pub mod actor;
pub mod address;
pub mod error;
pub mod reason;
pub mod time;

pub use actor::ActorId;
pub use address::{Role, TronAddress};
pub use error::TypeError;
pub use reason::Reason;
pub use time::{Clock, SystemClock, Timestamp};
