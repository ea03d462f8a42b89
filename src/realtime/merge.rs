//! # Change Merge
//!
//! Applies change events to a locally held, newest-first list so it tracks
//! the store without re-fetching.
//!
//! - INSERT prepends the new row.
//! - UPDATE replaces the first row with the same id, in place.
//! - DELETE removes the first row with the id of the old image.
//!
//! Nothing here fails. Events that cannot be applied come back as
//! [`MergeOutcome::Ignored`] with the reason, and the list is left as it was.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::event::{ChangeEvent, EventType, MalformedEvent};
use crate::observability::Event;
use crate::store::RecordId;

/// A row type a live list can hold
pub trait Record: DeserializeOwned + Clone {
    fn record_id(&self) -> Option<RecordId>;
}

impl Record for Value {
    fn record_id(&self) -> Option<RecordId> {
        RecordId::of(self)
    }
}

/// What to do with an INSERT whose id is already in the list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Prepend anyway; the row then appears twice
    #[default]
    Allow,
    /// Replace the existing row in place
    ReplaceExisting,
}

/// Why an event left the list untouched
#[derive(Debug, Clone, PartialEq)]
pub enum IgnoreReason {
    /// Event shape is wrong for its type
    Malformed(MalformedEvent),
    /// Row image does not decode into the list's row type
    Undecodable(String),
    /// No row in the list has this id
    NoMatch(RecordId),
}

/// Result of applying one event
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    Inserted,
    Replaced { index: usize },
    Removed { index: usize },
    Ignored(IgnoreReason),
}

impl MergeOutcome {
    pub fn is_applied(&self) -> bool {
        !matches!(self, MergeOutcome::Ignored(_))
    }
}

fn position<T: Record>(items: &[T], id: &RecordId) -> Option<usize> {
    items.iter().position(|item| item.record_id().as_ref() == Some(id))
}

fn decode<T: Record>(image: Option<&Value>) -> Result<T, IgnoreReason> {
    let value = image.cloned().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|e| IgnoreReason::Undecodable(e.to_string()))
}

/// Apply `event` to `items`
pub fn apply_change<T: Record>(items: &mut Vec<T>, event: &ChangeEvent, policy: DuplicatePolicy) -> MergeOutcome {
    let id = match event.validate() {
        Ok(id) => id,
        Err(reason) => return MergeOutcome::Ignored(IgnoreReason::Malformed(reason)),
    };

    match event.event_type {
        EventType::Insert => {
            let row = match decode::<T>(event.new.as_ref()) {
                Ok(row) => row,
                Err(reason) => return MergeOutcome::Ignored(reason),
            };
            if policy == DuplicatePolicy::ReplaceExisting {
                if let Some(index) = position(items, &id) {
                    items[index] = row;
                    return MergeOutcome::Replaced { index };
                }
            }
            items.insert(0, row);
            MergeOutcome::Inserted
        }
        EventType::Update => {
            let Some(index) = position(items, &id) else {
                return MergeOutcome::Ignored(IgnoreReason::NoMatch(id));
            };
            match decode::<T>(event.new.as_ref()) {
                Ok(row) => {
                    items[index] = row;
                    MergeOutcome::Replaced { index }
                }
                Err(reason) => MergeOutcome::Ignored(reason),
            }
        }
        EventType::Delete => match position(items, &id) {
            Some(index) => {
                items.remove(index);
                MergeOutcome::Removed { index }
            }
            None => MergeOutcome::Ignored(IgnoreReason::NoMatch(id)),
        },
    }
}

/// A newest-first list kept current by change events
#[derive(Debug, Clone)]
pub struct LiveList<T> {
    items: Vec<T>,
    policy: DuplicatePolicy,
}

impl<T: Record> LiveList<T> {
    pub fn new(initial: Vec<T>) -> Self {
        Self::with_policy(initial, DuplicatePolicy::default())
    }

    pub fn with_policy(initial: Vec<T>, policy: DuplicatePolicy) -> Self {
        Self {
            items: initial,
            policy,
        }
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Apply one event, logging anything that was dropped
    pub fn apply(&mut self, event: &ChangeEvent) -> MergeOutcome {
        let outcome = apply_change(&mut self.items, event, self.policy);

        match &outcome {
            MergeOutcome::Ignored(IgnoreReason::NoMatch(id)) => {
                tracing::debug!(table = %event.table, id = %id, event_type = %event.event_type, "no matching row, change skipped");
            }
            MergeOutcome::Ignored(reason) => {
                tracing::warn!(
                    event = %Event::ChangeIgnored,
                    table = %event.table,
                    event_type = %event.event_type,
                    reason = ?reason,
                    "change dropped before merge"
                );
            }
            _ => {}
        }

        outcome
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}
