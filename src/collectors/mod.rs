//! Periodic samplers that feed the `MetricRegistry`.
//!
//! Both collectors are best-effort: a failed sample never stops the loop and
//! is not retried before the next tick.

pub mod repository;
pub mod system;

pub use repository::{CommandGitClient, RepositoryCollector};
pub use system::{SysinfoProbe, SystemCollector};
