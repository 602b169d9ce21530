mod service;
mod session;

pub use service::MonitorService;
pub use session::{MonitorSession, SessionKey, SessionSummary};
