//! In-memory [`ProgressService`] for offline runs and tests.
//!
//! Mirrors the remote service's contract: a journey can be started once per
//! user (later starts report a conflict), state queries never modify data,
//! and progress accumulates up to the journey's total distance. Failures can
//! be queued per operation to exercise error paths.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::SyncError;
use crate::progress::percent_of;
use crate::sync::{ProgressService, RemoteProgress};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceOperation {
    Start,
    GetState,
    Progress,
}

#[derive(Debug, Clone, Copy)]
struct Record {
    progress_m: f64,
    started: bool,
}

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<(String, String), Record>,
    faults: Vec<(ServiceOperation, SyncError)>,
    calls: Vec<ServiceOperation>,
    last_next_landmark_m: Option<f64>,
}

#[derive(Debug, Default)]
pub struct InMemoryProgressService {
    inner: Mutex<Inner>,
}

impl InMemoryProgressService {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicking test thread must not wedge the others
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store progress for a (user, journey) pair.
    pub fn seed(&self, user_id: &str, journey_id: &str, progress_m: f64, started: bool) {
        self.lock().records.insert(
            (user_id.to_string(), journey_id.to_string()),
            Record { progress_m, started },
        );
    }

    /// Make the next call to `operation` fail with `error`.
    pub fn fail_next(&self, operation: ServiceOperation, error: SyncError) {
        self.lock().faults.push((operation, error));
    }

    pub fn progress_of(&self, user_id: &str, journey_id: &str) -> Option<f64> {
        self.lock()
            .records
            .get(&(user_id.to_string(), journey_id.to_string()))
            .map(|r| r.progress_m)
    }

    /// Every operation received, in order, including failed ones.
    pub fn calls(&self) -> Vec<ServiceOperation> {
        self.lock().calls.clone()
    }

    pub fn count(&self, operation: ServiceOperation) -> usize {
        self.lock().calls.iter().filter(|op| **op == operation).count()
    }

    /// `next_landmark_distance_m` of the most recent state query.
    pub fn last_next_landmark_distance(&self) -> Option<f64> {
        self.lock().last_next_landmark_m
    }

    fn begin(&self, operation: ServiceOperation) -> Result<MutexGuard<'_, Inner>, SyncError> {
        let mut inner = self.lock();
        inner.calls.push(operation);
        match inner.faults.iter().position(|(op, _)| *op == operation) {
            Some(i) => Err(inner.faults.remove(i).1),
            None => Ok(inner),
        }
    }
}

fn key(user_id: &str, journey_id: &str) -> (String, String) {
    (user_id.to_string(), journey_id.to_string())
}

fn not_found(user_id: &str, journey_id: &str) -> SyncError {
    SyncError::NotFound {
        user_id: user_id.to_string(),
        journey_id: journey_id.to_string(),
    }
}

#[async_trait]
impl ProgressService for InMemoryProgressService {
    async fn start(&self, user_id: &str, journey_id: &str) -> Result<RemoteProgress, SyncError> {
        let mut inner = self.begin(ServiceOperation::Start)?;
        let record = inner.records.entry(key(user_id, journey_id)).or_insert(Record {
            progress_m: 0.0,
            started: false,
        });
        if record.started {
            return Err(SyncError::Conflict {
                user_id: user_id.to_string(),
                journey_id: journey_id.to_string(),
            });
        }
        record.started = true;
        Ok(RemoteProgress {
            progress_m: record.progress_m,
            percent: 0.0,
            message: Some("journey started".to_string()),
        })
    }

    async fn get_state(
        &self,
        user_id: &str,
        journey_id: &str,
        total_distance_m: f64,
        next_landmark_distance_m: Option<f64>,
    ) -> Result<RemoteProgress, SyncError> {
        let mut inner = self.begin(ServiceOperation::GetState)?;
        inner.last_next_landmark_m = next_landmark_distance_m;
        let record = inner
            .records
            .get(&key(user_id, journey_id))
            .ok_or_else(|| not_found(user_id, journey_id))?;
        Ok(RemoteProgress {
            progress_m: record.progress_m,
            percent: percent_of(record.progress_m, total_distance_m),
            message: None,
        })
    }

    async fn progress(
        &self,
        user_id: &str,
        journey_id: &str,
        total_distance_m: f64,
        delta_m: f64,
    ) -> Result<RemoteProgress, SyncError> {
        let mut inner = self.begin(ServiceOperation::Progress)?;
        let record = inner
            .records
            .get_mut(&key(user_id, journey_id))
            .ok_or_else(|| not_found(user_id, journey_id))?;
        let mut progress_m = record.progress_m + delta_m.max(0.0);
        if total_distance_m > 0.0 {
            progress_m = progress_m.min(total_distance_m);
        }
        record.progress_m = progress_m;
        Ok(RemoteProgress {
            progress_m,
            percent: percent_of(progress_m, total_distance_m),
            message: Some("progress recorded".to_string()),
        })
    }
}
