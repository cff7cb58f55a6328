//! Mutating operations and their queued form.
//!
//! An [`Operation`] is the intent of a write against the backend. When the
//! write cannot be delivered it is wrapped in a [`PendingOperation`] and kept
//! until a replay succeeds. The persisted record shape is
//! `{"id", "kind", "payload", "enqueuedAt"}`; decoding is exhaustive over
//! [`OperationKind`], so a record with an unknown kind fails to decode.

use crate::{CreatureId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a queued operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(Uuid);

impl OperationId {
    /// Creates a new time-ordered operation ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OperationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Discriminant of an [`Operation`], as stored in the `kind` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    UpdateCurrency,
    AddOwnedCreature,
    AddStudyMinutes,
    ResetCreatureProgress,
    AddCreatureToPond,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::UpdateCurrency => "updateCurrency",
            OperationKind::AddOwnedCreature => "addOwnedCreature",
            OperationKind::AddStudyMinutes => "addStudyMinutes",
            OperationKind::ResetCreatureProgress => "resetCreatureProgress",
            OperationKind::AddCreatureToPond => "addCreatureToPond",
        };
        f.write_str(name)
    }
}

/// A write against the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Sets the absolute coin balance.
    UpdateCurrency { amount: i64 },
    /// Adds one creature of a species to the inventory.
    AddOwnedCreature { creature_id: CreatureId },
    /// Credits study minutes to an owned creature.
    AddStudyMinutes { creature_id: CreatureId, minutes: u32 },
    /// Clears an owned creature's progress (the server drops the row).
    ResetCreatureProgress { creature_id: CreatureId },
    /// Releases a creature into the pond.
    AddCreatureToPond { creature_id: CreatureId },
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct AmountPayload {
    amount: i64,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct CreaturePayload {
    creature_id: CreatureId,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct StudyPayload {
    creature_id: CreatureId,
    minutes: u32,
}

impl Operation {
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        match self {
            Operation::UpdateCurrency { .. } => OperationKind::UpdateCurrency,
            Operation::AddOwnedCreature { .. } => OperationKind::AddOwnedCreature,
            Operation::AddStudyMinutes { .. } => OperationKind::AddStudyMinutes,
            Operation::ResetCreatureProgress { .. } => OperationKind::ResetCreatureProgress,
            Operation::AddCreatureToPond { .. } => OperationKind::AddCreatureToPond,
        }
    }

    /// The creature this operation targets, if any.
    #[must_use]
    pub const fn creature_id(&self) -> Option<CreatureId> {
        match self {
            Operation::UpdateCurrency { .. } => None,
            Operation::AddOwnedCreature { creature_id }
            | Operation::AddStudyMinutes { creature_id, .. }
            | Operation::ResetCreatureProgress { creature_id }
            | Operation::AddCreatureToPond { creature_id } => Some(*creature_id),
        }
    }

    /// Encodes the kind-specific fields.
    pub fn payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        match *self {
            Operation::UpdateCurrency { amount } => serde_json::to_value(AmountPayload { amount }),
            Operation::AddStudyMinutes {
                creature_id,
                minutes,
            } => serde_json::to_value(StudyPayload {
                creature_id,
                minutes,
            }),
            Operation::AddOwnedCreature { creature_id }
            | Operation::ResetCreatureProgress { creature_id }
            | Operation::AddCreatureToPond { creature_id } => {
                serde_json::to_value(CreaturePayload { creature_id })
            }
        }
    }

    /// Decodes an operation from its kind and payload.
    pub fn from_parts(kind: OperationKind, payload: serde_json::Value) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            OperationKind::UpdateCurrency => {
                let p: AmountPayload = serde_json::from_value(payload)?;
                Operation::UpdateCurrency { amount: p.amount }
            }
            OperationKind::AddOwnedCreature => {
                let p: CreaturePayload = serde_json::from_value(payload)?;
                Operation::AddOwnedCreature {
                    creature_id: p.creature_id,
                }
            }
            OperationKind::AddStudyMinutes => {
                let p: StudyPayload = serde_json::from_value(payload)?;
                Operation::AddStudyMinutes {
                    creature_id: p.creature_id,
                    minutes: p.minutes,
                }
            }
            OperationKind::ResetCreatureProgress => {
                let p: CreaturePayload = serde_json::from_value(payload)?;
                Operation::ResetCreatureProgress {
                    creature_id: p.creature_id,
                }
            }
            OperationKind::AddCreatureToPond => {
                let p: CreaturePayload = serde_json::from_value(payload)?;
                Operation::AddCreatureToPond {
                    creature_id: p.creature_id,
                }
            }
        })
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::UpdateCurrency { amount } => write!(f, "updateCurrency(amount={amount})"),
            Operation::AddStudyMinutes {
                creature_id,
                minutes,
            } => write!(f, "addStudyMinutes(creature={creature_id}, minutes={minutes})"),
            other => match other.creature_id() {
                Some(id) => write!(f, "{}(creature={id})", other.kind()),
                None => write!(f, "{}", other.kind()),
            },
        }
    }
}

/// A write that failed to reach the backend and awaits replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PendingRecord", into = "PendingRecord")]
pub struct PendingOperation {
    pub id: OperationId,
    pub operation: Operation,
    pub enqueued_at: Timestamp,
}

impl PendingOperation {
    /// Wraps an operation with a fresh ID and the current time.
    #[must_use]
    pub fn new(operation: Operation) -> Self {
        Self {
            id: OperationId::new(),
            operation,
            enqueued_at: Timestamp::now(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        self.operation.kind()
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PendingRecord {
    id: OperationId,
    kind: OperationKind,
    payload: serde_json::Value,
    enqueued_at: Timestamp,
}

impl TryFrom<PendingRecord> for PendingOperation {
    type Error = serde_json::Error;

    fn try_from(record: PendingRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record.id,
            operation: Operation::from_parts(record.kind, record.payload)?,
            enqueued_at: record.enqueued_at,
        })
    }
}

impl From<PendingOperation> for PendingRecord {
    fn from(pending: PendingOperation) -> Self {
        // Payload structs only hold integers, so encoding cannot fail.
        let payload = pending
            .operation
            .payload()
            .unwrap_or(serde_json::Value::Null);
        Self {
            id: pending.id,
            kind: pending.operation.kind(),
            payload,
            enqueued_at: pending.enqueued_at,
        }
    }
}
