pub mod commit;
pub mod poll;

pub use poll::{PollSettings, Poller};
