use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::SystemTime,
};

use timebox_model::{InvocationId, InvocationInfo, InvocationStatus, SummaryRecord};

/// Finished entries kept for polling before the oldest are evicted.
pub const DEFAULT_FINISHED_CAP: usize = 1024;

/// In-memory invocation state, shared between the dispatcher and pollers.
///
/// Pending and running entries are never evicted; at most `finished_cap` finished ones are kept.
#[derive(Clone)]
pub struct InvocationState {
    inner: Arc<RwLock<HashMap<InvocationId, InvocationInfo>>>,
    finished_cap: usize,
}

impl Default for InvocationState {
    fn default() -> Self {
        Self::with_finished_cap(DEFAULT_FINISHED_CAP)
    }
}

impl InvocationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_finished_cap(cap: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            finished_cap: cap.max(1),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<InvocationId, InvocationInfo>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<InvocationId, InvocationInfo>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a freshly accepted invocation as `pending`.
    pub fn add(&self, id: InvocationId) {
        let now = SystemTime::now();
        let info = InvocationInfo {
            id: id.clone(),
            status: InvocationStatus::Pending,
            created_at: now,
            updated_at: now,
            summary: None,
        };
        self.write().insert(id, info);
    }

    pub fn set_running(&self, id: &InvocationId) {
        if let Some(info) = self.write().get_mut(id) {
            info.status = InvocationStatus::Running;
            info.updated_at = SystemTime::now();
        }
    }

    /// Mark finished and attach the summary record, then evict the oldest finished entries over the cap.
    pub fn finish(&self, id: &InvocationId, summary: SummaryRecord) {
        let mut map = self.write();
        let Some(info) = map.get_mut(id) else {
            return;
        };
        info.status = InvocationStatus::Finished;
        info.updated_at = SystemTime::now();
        info.summary = Some(summary);

        let mut finished: Vec<(SystemTime, InvocationId)> = map
            .values()
            .filter(|i| i.status == InvocationStatus::Finished)
            .map(|i| (i.updated_at, i.id.clone()))
            .collect();
        if finished.len() <= self.finished_cap {
            return;
        }
        finished.sort_by_key(|(at, _)| *at);
        let excess = finished.len() - self.finished_cap;
        for (_, old) in finished.into_iter().take(excess) {
            map.remove(&old);
        }
    }

    pub fn remove(&self, id: &InvocationId) {
        self.write().remove(id);
    }

    pub fn get(&self, id: &InvocationId) -> Option<InvocationInfo> {
        self.read().get(id).cloned()
    }

    pub fn list_all(&self) -> Vec<InvocationInfo> {
        self.read().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(last: &str) -> SummaryRecord {
        SummaryRecord {
            mode: "serialized".into(),
            last_outcome: last.into(),
            use_signals: "false".into(),
        }
    }

    #[test]
    fn add_and_get() {
        let state = InvocationState::new();
        let id = InvocationId::from("inv-1");

        state.add(id.clone());

        let info = state.get(&id).expect("invocation should exist");
        assert_eq!(info.id, id);
        assert_eq!(info.status, InvocationStatus::Pending);
        assert!(info.summary.is_none());
    }

    #[test]
    fn lifecycle_attaches_summary() {
        let state = InvocationState::new();
        let id = InvocationId::from("inv-1");

        state.add(id.clone());
        state.set_running(&id);
        assert_eq!(state.get(&id).unwrap().status, InvocationStatus::Running);

        state.finish(&id, record("timeout"));
        let info = state.get(&id).unwrap();
        assert_eq!(info.status, InvocationStatus::Finished);
        assert_eq!(info.summary.unwrap().last_outcome, "timeout");
        assert!(info.updated_at >= info.created_at);
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let state = InvocationState::new();
        let ghost = InvocationId::from("ghost");

        state.set_running(&ghost);
        state.finish(&ghost, record("ok"));

        assert!(state.get(&ghost).is_none());
        assert!(state.list_all().is_empty());
    }

    #[test]
    fn remove_deletes_entry() {
        let state = InvocationState::new();
        let id = InvocationId::from("inv-1");

        state.add(id.clone());
        state.remove(&id);
        assert!(state.get(&id).is_none());
    }

    #[test]
    fn oldest_finished_entries_are_evicted() {
        let state = InvocationState::with_finished_cap(2);
        let ids: Vec<InvocationId> = ["a", "b", "c"].into_iter().map(InvocationId::from).collect();
        let waiting = InvocationId::from("waiting");

        state.add(waiting.clone());
        for id in &ids {
            state.add(id.clone());
            state.set_running(id);
            std::thread::sleep(std::time::Duration::from_millis(2));
            state.finish(id, record("ok"));
        }

        assert!(state.get(&ids[0]).is_none());
        assert!(state.get(&ids[1]).is_some());
        assert!(state.get(&ids[2]).is_some());
        assert_eq!(state.get(&waiting).unwrap().status, InvocationStatus::Pending);
        assert_eq!(state.list_all().len(), 3);
    }
}
