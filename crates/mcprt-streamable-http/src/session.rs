//! Session manager (spec §4.4): tracks HTTP-transport session lifetime,
//! independent of the connection that created it — any request carrying a
//! session's `Mcp-Session-Id` may continue it.
//!
//! A single [`std::sync::Mutex`] guards the session table; `get` is the
//! fast path and never allocates past a clone of the small [`Session`]
//! record.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use rand::RngCore;

/// Length of a session ID in hex characters (16 bytes of entropy).
const SESSION_ID_HEX_LEN: usize = 32;

fn generate_session_id() -> String {
    let mut bytes = [0u8; SESSION_ID_HEX_LEN / 2];
    rand::rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// A session's bookkeeping state: when it was created, when it was last
/// touched, and the timeout that governs its expiry.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub created_at: Instant,
    pub last_activity: Instant,
    pub timeout: Duration,
}

impl Session {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.last_activity) > self.timeout
    }
}

/// In-memory session table (spec §4.4).
///
/// `create` allocates a 32-hex-char cryptographically random ID; `get` is
/// the hot path read; `touch` bumps `last_activity`; `terminate` removes a
/// session and reports whether it existed; `cleanup_expired` sweeps the
/// table in one pass, collecting expired IDs before removing them so the
/// removal doesn't fight the scan over the same lock acquisition.
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Create a new session with the given inactivity timeout and return its ID.
    pub fn create(&self, timeout: Duration) -> String {
        let now = Instant::now();
        let id = generate_session_id();
        let session = Session {
            id: id.clone(),
            created_at: now,
            last_activity: now,
            timeout,
        };
        self.sessions
            .lock()
            .expect("session table mutex poisoned")
            .insert(id.clone(), session);
        id
    }

    /// Look up a session by ID. Returns `None` for unknown or expired IDs.
    pub fn get(&self, id: &str) -> Option<Session> {
        let sessions = self.sessions.lock().expect("session table mutex poisoned");
        let session = sessions.get(id)?;
        if session.is_expired(Instant::now()) {
            return None;
        }
        Some(session.clone())
    }

    /// Update a session's last-activity timestamp.
    pub fn touch(&self, id: &str) {
        let mut sessions = self.sessions.lock().expect("session table mutex poisoned");
        if let Some(session) = sessions.get_mut(id) {
            session.last_activity = Instant::now();
        }
    }

    /// Terminate a session. Returns `true` if it existed.
    ///
    /// Termination is terminal: once removed, the same ID never maps back
    /// to a live session, even if re-presented before cleanup would have
    /// expired it naturally.
    pub fn terminate(&self, id: &str) -> bool {
        self.sessions
            .lock()
            .expect("session table mutex poisoned")
            .remove(id)
            .is_some()
    }

    /// Remove all expired sessions, returning how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().expect("session table mutex poisoned");
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, s)| s.is_expired(now))
            .map(|(id, _)| id.clone())
            .collect();
        let count = expired.len();
        for id in expired {
            sessions.remove(&id);
        }
        count
    }

    /// Number of sessions currently tracked (including any not yet swept
    /// past expiry).
    pub fn active_count(&self) -> usize {
        self.sessions.lock().expect("session table mutex poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_yields_unique_32_char_hex_ids() {
        let mgr = SessionManager::new();
        let a = mgr.create(Duration::from_secs(60));
        let b = mgr.create(Duration::from_secs(60));
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn get_returns_session_until_terminated() {
        let mgr = SessionManager::new();
        let id = mgr.create(Duration::from_secs(60));
        assert!(mgr.get(&id).is_some());
        assert!(mgr.terminate(&id));
        assert!(mgr.get(&id).is_none());
    }

    #[test]
    fn termination_is_terminal() {
        let mgr = SessionManager::new();
        let id = mgr.create(Duration::from_secs(60));
        assert!(mgr.terminate(&id));
        assert!(!mgr.terminate(&id));
        assert!(mgr.get(&id).is_none());
    }

    #[test]
    fn unknown_session_get_returns_none() {
        let mgr = SessionManager::new();
        assert!(mgr.get("does-not-exist").is_none());
    }

    #[test]
    fn touch_resets_expiry_clock() {
        let mgr = SessionManager::new();
        let id = mgr.create(Duration::from_millis(50));
        std::thread::sleep(Duration::from_millis(30));
        mgr.touch(&id);
        std::thread::sleep(Duration::from_millis(30));
        // 60ms total elapsed since creation, but only 30ms since the touch.
        assert!(mgr.get(&id).is_some());
    }

    #[test]
    fn cleanup_expired_sweeps_only_expired_sessions() {
        let mgr = SessionManager::new();
        let short = mgr.create(Duration::from_millis(10));
        let long = mgr.create(Duration::from_secs(60));
        std::thread::sleep(Duration::from_millis(30));

        let removed = mgr.cleanup_expired();
        assert_eq!(removed, 1);
        assert!(mgr.get(&short).is_none());
        assert!(mgr.get(&long).is_some());
        assert_eq!(mgr.active_count(), 1);
    }

    #[test]
    fn active_count_tracks_table_size() {
        let mgr = SessionManager::new();
        assert_eq!(mgr.active_count(), 0);
        mgr.create(Duration::from_secs(60));
        mgr.create(Duration::from_secs(60));
        assert_eq!(mgr.active_count(), 2);
    }
}
