//! PortRegistry — the instance-id → port bookkeeping behind the control plane.
//!
//! One record per instance id, held in memory for the lifetime of the
//! coordination server process. The registry never binds the ports it hands
//! out; it records what `detect` reported free and trusts callers to bind
//! promptly.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tokio::sync::RwLock;

use crate::error::HarborError;
use crate::ports::detect::detect_port;
use crate::ports::{MAX_PORT, MIN_PORT};

/// Outcome of one batch-assign call.
///
/// `ports` holds the freshly detected ports for non-conflicted instance ids, in
/// input order. `conflicts` holds the instance ids that already had an
/// assignment, paired with their existing port — those are skipped, never
/// overwritten.
#[derive(Debug)]
pub struct BatchAssignment {
    pub ports: Vec<u16>,
    pub conflicts: Vec<(String, u16)>,
}

/// In-memory map of instance id → assigned port.
pub struct PortRegistry {
    assignments: RwLock<HashMap<String, u16>>,
}

impl PortRegistry {
    pub fn new() -> Self {
        Self {
            assignments: RwLock::new(HashMap::new()),
        }
    }

    /// Snapshot of the full current mapping.
    pub async fn list(&self) -> HashMap<String, u16> {
        self.assignments.read().await.clone()
    }

    /// Number of active assignments.
    pub async fn count(&self) -> usize {
        self.assignments.read().await.len()
    }

    /// The port assigned to `instance_id`, if any.
    pub async fn get(&self, instance_id: &str) -> Option<u16> {
        self.assignments.read().await.get(instance_id).copied()
    }

    /// Assign ports to a batch of instance ids, optionally preferring `desired`.
    ///
    /// A desired port outside `MIN_PORT..=MAX_PORT` rejects the whole batch
    /// before any detection runs — the port applies batch-wide, so every
    /// element would fail the same check. Conflicted ids are collected and
    /// skipped; all remaining detections are fanned out concurrently and joined
    /// before anything is recorded. Each successful detection is recorded
    /// independently, so one failed detection never corrupts the others.
    pub async fn assign_batch(
        &self,
        instance_ids: &[String],
        desired: Option<u32>,
    ) -> crate::Result<BatchAssignment> {
        let desired = match desired {
            None => None,
            Some(raw) => match u16::try_from(raw) {
                Ok(port) if (MIN_PORT..=MAX_PORT).contains(&port) => Some(port),
                _ => return Err(HarborError::PortOutOfRange(raw)),
            },
        };

        // Split conflicted ids from fresh ones before any detection runs.
        let mut conflicts = Vec::new();
        let mut fresh = Vec::new();
        {
            let map = self.assignments.read().await;
            for id in instance_ids {
                match map.get(id) {
                    Some(&port) => conflicts.push((id.clone(), port)),
                    None => fresh.push(id.clone()),
                }
            }
        }

        // Fan out one detection per fresh id and join the whole batch.
        let detections = fresh.iter().map(|_| detect_port(desired));
        let detected = futures::future::join_all(detections).await;

        let mut ports = Vec::with_capacity(fresh.len());
        let mut first_err = None;
        {
            let mut map = self.assignments.write().await;
            for (id, result) in fresh.into_iter().zip(detected) {
                match result {
                    Ok(port) => match map.entry(id) {
                        // A concurrent request (or a duplicate id in this batch)
                        // got there first — treat as a conflict, keep the
                        // existing assignment.
                        Entry::Occupied(existing) => {
                            conflicts.push((existing.key().clone(), *existing.get()));
                        }
                        Entry::Vacant(slot) => {
                            tracing::debug!(instance = %slot.key(), port, "port assigned");
                            slot.insert(port);
                            ports.push(port);
                        }
                    },
                    Err(e) => {
                        if first_err.is_none() {
                            first_err = Some(e);
                        }
                    }
                }
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(BatchAssignment { ports, conflicts }),
        }
    }

    /// Remove the assignment for `instance_id`, returning the released port.
    pub async fn release(&self, instance_id: &str) -> crate::Result<u16> {
        match self.assignments.write().await.remove(instance_id) {
            Some(port) => {
                tracing::debug!(instance = %instance_id, port, "port released");
                Ok(port)
            }
            None => Err(HarborError::InstanceNotFound(instance_id.to_string())),
        }
    }
}

impl Default for PortRegistry {
    fn default() -> Self {
        Self::new()
    }
}
