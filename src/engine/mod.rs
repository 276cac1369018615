mod availability;
mod error;
mod mutations;
mod queries;
mod rules;
#[cfg(test)]
mod tests;

pub use availability::{is_room_available, period_has_conflict};
pub use error::EngineError;
pub use rules::{exceeds_consecutive_cap, validate, MAX_ADVANCE_DAYS, MAX_STAY_DAYS};

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, RwLock};

use crate::model::*;
use crate::wal::Wal;

pub type SharedRoomState = Arc<RwLock<RoomState>>;

// ── Group-commit WAL channel ─────────────────────────────

pub(super) enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task that owns the WAL and batches appends for group commit.
/// 1. Block until the first Append arrives.
/// 2. Buffer it (no fsync).
/// 3. Drain all immediately available Appends (the batch window).
/// 4. Single flush_sync for the whole batch.
/// 5. Respond Ok to all senders.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WalCommand::Append { event, response } => {
                let mut batch = vec![(event, response)];

                // Drain all immediately available appends
                loop {
                    match rx.try_recv() {
                        Ok(WalCommand::Append { event, response }) => {
                            batch.push((event, response));
                        }
                        Ok(other) => {
                            // Flush current batch first, then handle the non-append command
                            flush_and_respond(&mut wal, &mut batch);
                            handle_non_append(&mut wal, other);
                            break;
                        }
                        Err(_) => break, // channel empty — flush batch
                    }
                }

                if !batch.is_empty() {
                    flush_and_respond(&mut wal, &mut batch);
                }
            }
            other => handle_non_append(&mut wal, other),
        }
    }
}

fn flush_and_respond(wal: &mut Wal, batch: &mut Vec<(Event, oneshot::Sender<io::Result<()>>)>) {
    metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let flush_start = std::time::Instant::now();
    let result = flush_batch(wal, batch);
    metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
        .record(flush_start.elapsed().as_secs_f64());
    respond_batch(batch, &result);
}

fn flush_batch(
    wal: &mut Wal,
    batch: &mut [(Event, oneshot::Sender<io::Result<()>>)],
) -> io::Result<()> {
    let mut append_err: Option<io::Error> = None;
    for (event, _) in batch.iter() {
        if let Err(e) = wal.append_buffered(event) {
            append_err = Some(e);
            break;
        }
    }
    // Always flush — even on append error — so partially buffered bytes
    // don't leak into the next batch (callers were told this batch failed).
    let flush_err = wal.flush_sync().err();
    if let Some(e) = append_err {
        return Err(e);
    }
    if let Some(e) = flush_err {
        return Err(e);
    }
    Ok(())
}

fn respond_batch(batch: &mut Vec<(Event, oneshot::Sender<io::Result<()>>)>, result: &io::Result<()>) {
    for (_, tx) in batch.drain(..) {
        let r = match result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let result = Wal::write_compact_file(wal.path(), &events)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { .. } => unreachable!(),
    }
}

/// One room's reservation engine: the in-memory ledger plus its WAL.
/// Every mutation validates, appends, then applies under the room's write
/// lock, so the check-validate-persist sequence is a single critical
/// section per room.
pub struct Engine {
    room: SharedRoomState,
    pub(super) wal_tx: mpsc::Sender<WalCommand>,
}

/// Apply an event directly to the room ledger (no locking — caller holds
/// the lock).
fn apply_to_room(room: &mut RoomState, event: &Event) {
    match event {
        Event::ReservationCreated {
            id,
            stay,
            reserved_by,
            created_at,
        } => {
            room.insert_reservation(Reservation {
                id: *id,
                stay: *stay,
                reserved_by: reserved_by.clone(),
                canceled: false,
                created_at: *created_at,
                modified_at: *created_at,
            });
        }
        Event::ReservationModified {
            id,
            stay,
            modified_at,
        } => {
            // The stay may move, so the sort position is recomputed.
            if let Some(mut reservation) = room.remove_reservation(*id) {
                reservation.stay = *stay;
                reservation.modified_at = *modified_at;
                room.insert_reservation(reservation);
            }
        }
        Event::ReservationCancelled { id, modified_at } => {
            if let Some(reservation) = room.find_mut(id) {
                reservation.canceled = true;
                reservation.modified_at = *modified_at;
            }
        }
    }
}

impl Engine {
    pub fn new(wal_path: PathBuf) -> std::io::Result<Self> {
        let events = Wal::replay(&wal_path)?;
        let wal = Wal::open(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let mut room = RoomState::new();
        for event in &events {
            apply_to_room(&mut room, event);
        }

        Ok(Self {
            room: Arc::new(RwLock::new(room)),
            wal_tx,
        })
    }

    pub fn room(&self) -> SharedRoomState {
        self.room.clone()
    }

    /// Write event to WAL via the background group-commit writer.
    async fn wal_append(&self, event: &Event) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    /// WAL-append + apply in one call. The caller holds the room write lock,
    /// so the event is durable before it becomes visible.
    pub(super) async fn persist_and_apply(
        &self,
        room: &mut RoomState,
        event: &Event,
    ) -> Result<(), EngineError> {
        self.wal_append(event).await?;
        apply_to_room(room, event);
        Ok(())
    }
}
