//! Periodic background processors.
//!
//! - `StalenessAuditor`: re-derives staleness for every live order on
//!   each configured chain on a fixed interval
//! - `CancellationExpiry`: reverts cancellation requests that never
//!   confirmed on chain within the timeout
//!
//! Both are safe to run on every instance of the service: each pass is
//! guarded by a database lease, so exactly one instance does the work
//! per interval and the rest skip.

pub mod cancellation_expiry;
pub mod staleness_auditor;

pub use cancellation_expiry::CancellationExpiry;
pub use staleness_auditor::StalenessAuditor;
