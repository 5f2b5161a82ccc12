//! In-memory collaborators for tests and offline development.

use crate::domain::ports::{ClientGroupDirectory, Session};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// A `Session` that serves one canned document for every GET and records
/// every POST body. Either direction can be switched to fail to simulate
/// a transport outage.
pub struct MockSession {
    document: Value,
    posted: Mutex<Vec<(String, Value)>>,
    fail_gets: AtomicBool,
    fail_posts: AtomicBool,
}

impl MockSession {
    pub fn new(document: Value) -> Self {
        Self {
            document,
            posted: Mutex::new(Vec::new()),
            fail_gets: AtomicBool::new(false),
            fail_posts: AtomicBool::new(false),
        }
    }

    pub fn fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    pub fn fail_posts(&self, fail: bool) {
        self.fail_posts.store(fail, Ordering::SeqCst);
    }

    /// Everything POSTed so far, as (endpoint, body) pairs.
    pub fn posted(&self) -> Vec<(String, Value)> {
        self.posted.lock().unwrap().clone()
    }
}

#[async_trait]
impl Session for MockSession {
    async fn get(&self, endpoint: &str) -> Result<Value> {
        if self.fail_gets.load(Ordering::SeqCst) {
            anyhow::bail!("mock transport failure for GET {}", endpoint);
        }
        Ok(self.document.clone())
    }

    async fn post(&self, endpoint: &str, body: &Value) -> Result<Value> {
        if self.fail_posts.load(Ordering::SeqCst) {
            anyhow::bail!("mock transport failure for POST {}", endpoint);
        }
        self.posted
            .lock()
            .unwrap()
            .push((endpoint.to_string(), body.clone()));
        Ok(Value::Null)
    }
}

/// A `ClientGroupDirectory` backed by a fixed name -> id table.
pub struct MockClientGroupDirectory {
    groups: HashMap<String, i64>,
}

impl MockClientGroupDirectory {
    pub fn new(groups: &[(&str, i64)]) -> Self {
        Self {
            groups: groups
                .iter()
                .map(|(name, id)| (name.to_lowercase(), *id))
                .collect(),
        }
    }
}

#[async_trait]
impl ClientGroupDirectory for MockClientGroupDirectory {
    async fn resolve(&self, name: &str) -> Result<Option<i64>> {
        Ok(self.groups.get(&name.to_lowercase()).copied())
    }
}
