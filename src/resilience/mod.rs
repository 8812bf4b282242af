pub mod health;
pub mod timeout;

pub use health::{HealthReporter, HealthStatus, SourceHealth};
pub use timeout::TimeoutExt;
