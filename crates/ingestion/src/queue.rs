//! Job queue - preloaded, closed channel of vehicle records

use async_channel::{bounded, Receiver};
use contracts::VehicleRecord;
use tracing::debug;

/// Consumer side of the job queue; clone one per worker
pub type JobReceiver = Receiver<VehicleRecord>;

/// Multi-consumer job source for the worker pool
///
/// Every record is queued up front and the sending side is closed, so
/// workers drain the queue and then observe closure instead of waiting on
/// an external completion signal.
pub struct JobQueue;

impl JobQueue {
    /// Queue all records and close the channel
    pub fn preloaded(records: Vec<VehicleRecord>) -> JobReceiver {
        let (tx, rx) = bounded(records.len().max(1));
        let count = records.len();

        for record in records {
            // capacity == record count
            let _ = tx.try_send(record);
        }
        tx.close();

        debug!(count, "Job queue preloaded and closed");
        rx
    }
}
