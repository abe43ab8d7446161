pub mod notification;
pub mod state;

pub use notification::{Milestone, Notification, PendingNotification, StoreMutation};
pub use state::{decide, Phase, Policy};
