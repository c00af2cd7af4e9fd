// Pending transaction reconciliation
pub mod daemon;
pub mod hooks;
pub mod scheduler;

pub use daemon::{PendingTxDaemon, ReconcileReport};
pub use hooks::PlatformHooks;
pub use scheduler::{ReconcileScheduleConfig, ReconcileScheduler};
