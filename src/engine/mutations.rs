use tokio::sync::oneshot;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::availability::{is_room_available, now_ms, validate_days};
use super::rules;
use super::{Engine, EngineError, WalCommand};

impl Engine {
    /// Create a reservation: room availability first, then the structural
    /// rules, then the guest consecutive-stay cap. The first failing stage
    /// reports and nothing is persisted. On success the persisted record,
    /// with its assigned identifier, is returned.
    pub async fn create_reservation(
        &self,
        draft: ReservationDraft,
    ) -> Result<Reservation, EngineError> {
        if draft.reserved_by.len() > MAX_GUEST_NAME_LEN {
            return Err(EngineError::LimitExceeded("guest name too long"));
        }
        validate_days(&draft.stay)?;

        let room = self.room();
        let mut guard = room.write().await;
        if guard.reservations.len() >= MAX_RESERVATIONS_PER_ROOM {
            return Err(EngineError::LimitExceeded("too many reservations"));
        }

        if !is_room_available(&guard, &draft.stay) {
            return Err(EngineError::Conflict);
        }

        let today = today_utc();
        let errors = rules::validate(&draft, today);
        if !errors.is_empty() {
            return Err(EngineError::Validation(errors));
        }

        let guest_stays: Vec<Stay> = guard
            .reservations
            .iter()
            .filter(|r| !r.canceled && r.reserved_by == draft.reserved_by)
            .map(|r| r.stay)
            .collect();
        if rules::exceeds_consecutive_cap(&draft.stay, &guest_stays) {
            return Err(EngineError::Validation(vec![
                rules::MSG_CONSECUTIVE_LIMIT.to_string(),
            ]));
        }

        let id = Ulid::new();
        let created_at = now_ms();
        let event = Event::ReservationCreated {
            id,
            stay: draft.stay,
            reserved_by: draft.reserved_by.clone(),
            created_at,
        };
        self.persist_and_apply(&mut guard, &event).await?;

        Ok(Reservation {
            id,
            stay: draft.stay,
            reserved_by: draft.reserved_by,
            canceled: false,
            created_at,
            modified_at: created_at,
        })
    }

    /// Modify a reservation's dates: validate → authorize-guest-match →
    /// persist. Neither the availability check nor the consecutive-stay cap
    /// is re-run against the new dates; the pipeline stays additive if they
    /// ever are.
    pub async fn modify_reservation(
        &self,
        id: Ulid,
        draft: ReservationDraft,
    ) -> Result<Reservation, EngineError> {
        if draft.reserved_by.len() > MAX_GUEST_NAME_LEN {
            return Err(EngineError::LimitExceeded("guest name too long"));
        }
        validate_days(&draft.stay)?;

        let room = self.room();
        let mut guard = room.write().await;

        let today = today_utc();
        let errors = rules::validate(&draft, today);
        if !errors.is_empty() {
            return Err(EngineError::Validation(errors));
        }

        let existing = guard.find(&id).ok_or(EngineError::NotFound(id))?;
        if existing.reserved_by != draft.reserved_by {
            return Err(EngineError::GuestMismatch);
        }
        let reserved_by = existing.reserved_by.clone();
        let canceled = existing.canceled;
        let created_at = existing.created_at;

        let modified_at = now_ms();
        let event = Event::ReservationModified {
            id,
            stay: draft.stay,
            modified_at,
        };
        self.persist_and_apply(&mut guard, &event).await?;

        Ok(Reservation {
            id,
            stay: draft.stay,
            reserved_by,
            canceled,
            created_at,
            modified_at,
        })
    }

    /// Flag a reservation as cancelled. The record stays in the ledger and
    /// remains retrievable by id. Cancelling twice succeeds both times; the
    /// flag only ever moves one way.
    pub async fn cancel_reservation(&self, id: Ulid) -> Result<(), EngineError> {
        let room = self.room();
        let mut guard = room.write().await;

        if guard.find(&id).is_none() {
            return Err(EngineError::NotFound(id));
        }

        let event = Event::ReservationCancelled {
            id,
            modified_at: now_ms(),
        };
        self.persist_and_apply(&mut guard, &event).await
    }

    /// Compact the WAL by rewriting it with only the events needed to
    /// recreate the current ledger. Holds the room write lock for the
    /// duration so no append can race the snapshot.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        let room = self.room();
        let guard = room.write().await;

        let mut events = Vec::with_capacity(guard.reservations.len());
        for r in &guard.reservations {
            events.push(Event::ReservationCreated {
                id: r.id,
                stay: r.stay,
                reserved_by: r.reserved_by.clone(),
                created_at: r.created_at,
            });
            if r.canceled {
                events.push(Event::ReservationCancelled {
                    id: r.id,
                    modified_at: r.modified_at,
                });
            } else if r.modified_at != r.created_at {
                events.push(Event::ReservationModified {
                    id: r.id,
                    stay: r.stay,
                    modified_at: r.modified_at,
                });
            }
        }

        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact {
                events,
                response: tx,
            })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
