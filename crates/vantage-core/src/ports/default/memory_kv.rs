//! Default KV store port: process-local map.
//!
//! Grounded on the memory coordinator's documented degraded fallback (spec
//! §4.4 "if the KV port is unavailable, use a process-local map and flag
//! degraded") — here it is simply *the* default KV implementation rather
//! than a fallback wrapper, since the spec leaves the real backend (Redis,
//! etc.) to deployment configuration.

use crate::error::KvError;
use crate::ports::KvStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

#[derive(Default)]
pub struct InMemoryKvStore {
    map: Mutex<HashMap<String, Entry>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        let mut map = self.map.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = map.get(key) {
            if entry.expires_at < Instant::now() {
                map.remove(key);
                return Ok(None);
            }
            return Ok(Some(entry.value.clone()));
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), KvError> {
        let mut map = self.map.lock().unwrap_or_else(|e| e.into_inner());
        map.insert(key.to_string(), Entry { value, expires_at: Instant::now() + ttl });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        let mut map = self.map.lock().unwrap_or_else(|e| e.into_inner());
        map.remove(key);
        Ok(())
    }
}
