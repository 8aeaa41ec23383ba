pub mod authority;
pub mod pipeline;
pub mod risk_monitor;
pub mod service;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

pub use authority::AuthorityRecommender;
pub use pipeline::scheduler::{ListenerState, ListeningDeps, ListeningScheduler};
pub use risk_monitor::RiskMonitor;
pub use service::ListeningService;
