//! Address reputation and association engine.
//!
//! Tracks trust for TRON addresses acting as energy providers or payment
//! receivers and resolves, for any observed provider/payment pair, which
//! warning or endorsement applies:
//!
//! - **Associations**: observed provider → payment pairs plus the persisted
//!   propagation toggle.
//! - **Blacklist / whitelist managers**: role-scoped entries and pair-scoped
//!   combos with uniqueness per key.
//! - **Propagation**: manual provider blacklisting fans out to associated
//!   payment addresses, never the other way round.
//! - **Voting**: user feedback creates temporary entries that expire, get
//!   promoted by distinct voters, or are cancelled.
//! - **Resolver**: a read-only verdict with fixed precedence.
//!
//! [`ReputationEngine`] wraps all of it in store transactions.

pub mod association;
pub mod backup;
pub mod blacklist;
pub mod config;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod maintenance;
pub mod propagation;
pub mod resolver;
pub mod voting;
pub mod whitelist;

pub use association::RecordOutcome;
pub use backup::{RestoreMode, RestoreReport};
pub use blacklist::{BlacklistAdded, BlacklistManager, BlacklistStats};
pub use config::EngineConfig;
pub use engine::{Caller, ReputationEngine};
pub use error::ReputationError;
pub use lifecycle::TemporaryPolicy;
pub use maintenance::{ClearMode, ClearReport, PurgeReport, VerificationReport};
pub use resolver::Verdict;
pub use voting::{Feedback, FeedbackOutcome, FeedbackProcessor, RevokeEffect, TargetEffect, VoteTarget};
pub use whitelist::{WhitelistManager, WhitelistStats};
