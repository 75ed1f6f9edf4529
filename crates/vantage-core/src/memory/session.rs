//! Session tier of the memory coordinator (spec §4.4): sliding-window
//! conversation state backed by the KV port, with an atomic
//! get-or-create and a process-local degraded fallback when the port is
//! unavailable (spec §7 propagation policy).

use crate::data::{Session, SessionTurn};
use crate::ports::KvStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct SessionStore {
    kv: Arc<dyn KvStore>,
    window_size: usize,
    ttl: Duration,
    /// Degraded fallback used when the KV port is unavailable (spec §4.4,
    /// §7). Not synced back to the KV port once it recovers; a fresh
    /// session is created there on next successful write.
    fallback: Mutex<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KvStore>, window_size: usize, ttl: Duration) -> Self {
        Self { kv, window_size, ttl, fallback: Mutex::new(HashMap::new()) }
    }

    fn key(session_id: &str) -> String {
        format!("session:{session_id}")
    }

    /// Returns the session plus whether the KV port had to be bypassed.
    pub async fn get_or_create(&self, session_id: &str, user_id: Option<&str>) -> (Session, bool) {
        match self.kv.get(&Self::key(session_id)).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<Session>(&bytes) {
                Ok(session) => return (session, false),
                Err(_) => return (Session::new(session_id.to_string(), user_id.map(String::from), self.window_size), false),
            },
            Ok(None) => return (Session::new(session_id.to_string(), user_id.map(String::from), self.window_size), false),
            Err(_) => {}
        }

        let mut fallback = self.fallback.lock().unwrap_or_else(|e| e.into_inner());
        let session = fallback
            .entry(session_id.to_string())
            .or_insert_with(|| Session::new(session_id.to_string(), user_id.map(String::from), self.window_size))
            .clone();
        (session, true)
    }

    pub async fn push_turn(&self, session_id: &str, user_id: Option<&str>, turn: SessionTurn) -> bool {
        let (mut session, mut degraded) = self.get_or_create(session_id, user_id).await;
        session.push_turn(turn);

        if !degraded {
            if let Ok(bytes) = serde_json::to_vec(&session) {
                if self.kv.set(&Self::key(session_id), bytes, self.ttl).await.is_err() {
                    degraded = true;
                }
            }
        }
        if degraded {
            let mut fallback = self.fallback.lock().unwrap_or_else(|e| e.into_inner());
            fallback.insert(session_id.to_string(), session);
        }
        degraded
    }

    pub async fn clear(&self, session_id: &str) {
        let _ = self.kv.delete(&Self::key(session_id)).await;
        self.fallback.lock().unwrap_or_else(|e| e.into_inner()).remove(session_id);
    }
}
