pub mod log;
pub mod notify;
pub mod registry;

pub use log::*;
pub use notify::{LineNotifier, LogNotifier, Notifier, WebhookNotifier};
pub use registry::*;
