//! Write-then-deliver protocol for a single notification.
//!
//! 1. Every store mutation for the milestone is written. If any write
//!    fails the notification is dropped for this tick; nothing was sent, so
//!    the guard still holds next tick and it is retried.
//! 2. The message is delivered. A failure here is reported but not
//!    retried: the flag is already set, so the milestone will not fire
//!    again.
//! 3. For landings, the row is deleted, but only after a successful
//!    delivery. Rows left behind with the landing flag set are picked up
//!    by the reconciliation sweep at the start of the next tick.

use tracing::info;

use crate::db::FlightStore;
use crate::delivery::{DeliverySink, SlackMessage};
use crate::engine::{PendingNotification, StoreMutation};
use crate::error::{DeliveryError, StoreError};

#[derive(Debug)]
pub enum CommitOutcome {
    Delivered,
    /// Terminal milestone delivered and the row removed.
    Completed,
    Abandoned(StoreError),
    Undelivered(DeliveryError),
    RemovalFailed(StoreError),
}

impl CommitOutcome {
    pub fn was_delivered(&self) -> bool {
        matches!(
            self,
            CommitOutcome::Delivered | CommitOutcome::Completed | CommitOutcome::RemovalFailed(_)
        )
    }
}

pub async fn commit(
    store: &dyn FlightStore,
    sink: &dyn DeliverySink,
    pending: &PendingNotification,
    message: &SlackMessage,
) -> CommitOutcome {
    let milestone = pending.milestone().as_str();

    for mutation in &pending.mutations {
        let written = match *mutation {
            StoreMutation::SetFlag(flag) => store.set_flag(&pending.key, flag, true).await,
            StoreMutation::SetCruiseTimestamp(ts) => {
                store.set_cruise_timestamp(&pending.key, ts).await
            }
        };
        if let Err(e) = written {
            return CommitOutcome::Abandoned(e);
        }
    }

    if let Err(e) = sink.send(message).await {
        return CommitOutcome::Undelivered(e);
    }
    info!("Sent {} notification for {}", milestone, pending.key);

    if !pending.delete_after_delivery {
        return CommitOutcome::Delivered;
    }

    match store.delete(&pending.key).await {
        Ok(_) => {
            info!("Stopped tracking landed flight {}", pending.key);
            CommitOutcome::Completed
        }
        Err(e) => CommitOutcome::RemovalFailed(e),
    }
}
