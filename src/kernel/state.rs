use super::event::{ClientId, Origin};
use super::time::Timestamp;
use std::collections::HashMap;
use std::time::Duration;

/// A contiguous period of connectivity, bounded by duration resets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub started_at: Timestamp,
    pub duration: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRecord {
    pub id: ClientId,
    pub origin: Origin,
    /// Chronological discovery order, never empty, append-only within a window.
    sessions: Vec<Session>,
    pub classified_long: bool,
}

impl ClientRecord {
    pub fn new(id: ClientId, origin: Origin, first: Session, classified_long: bool) -> Self {
        Self {
            id,
            origin,
            sessions: vec![first],
            classified_long,
        }
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn last_session(&self) -> &Session {
        // sessions is non-empty by construction
        &self.sessions[self.sessions.len() - 1]
    }

    pub(crate) fn last_session_mut(&mut self) -> &mut Session {
        let last = self.sessions.len() - 1;
        &mut self.sessions[last]
    }

    pub(crate) fn push_session(&mut self, session: Session) {
        self.sessions.push(session);
    }
}

/// Per-window accumulation of client records.
///
/// Records keep their discovery order so exports and aggregate counts are
/// reproducible; `index` maps a client id to its position.
#[derive(Debug, Clone)]
pub struct WindowState {
    pub started_at: Timestamp,
    records: Vec<ClientRecord>,
    index: HashMap<ClientId, usize>,
}

impl WindowState {
    pub fn new(started_at: Timestamp) -> Self {
        Self {
            started_at,
            records: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn records(&self) -> &[ClientRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ClientRecord> {
        self.index.get(id).map(|&i| &self.records[i])
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut ClientRecord> {
        match self.index.get(id) {
            Some(&i) => self.records.get_mut(i),
            None => None,
        }
    }

    pub(crate) fn insert(&mut self, record: ClientRecord) {
        debug_assert!(!self.index.contains_key(&record.id), "duplicate client record");
        self.index.insert(record.id.clone(), self.records.len());
        self.records.push(record);
    }

    pub fn into_records(self) -> Vec<ClientRecord> {
        self.records
    }

    /// Detaches the accumulated records and starts a fresh window at `now`.
    pub fn reset(&mut self, now: Timestamp) -> WindowState {
        std::mem::replace(self, WindowState::new(now))
    }
}
