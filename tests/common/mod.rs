#![allow(dead_code)]

use anyhow::{anyhow, Result};
use backoffice_queue::{ActionKind, AdminBackend, Entity, EntityId, RemoteReply};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Duration;

/// How the fake backend answers a call for one id.
#[derive(Debug, Clone)]
pub enum Script {
    Reply(RemoteReply),
    Fail(String),
    Delay(Duration, RemoteReply),
    Hang,
}

#[derive(Clone, Default)]
pub struct RecordingBackend {
    listing: Arc<Mutex<Vec<Entity>>>,
    scripts: Arc<Mutex<HashMap<String, Script>>>,
    calls: Arc<Mutex<Vec<(ActionKind, String)>>>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

impl RecordingBackend {
    pub fn with_listing(entities: Vec<Entity>) -> Self {
        Self {
            listing: Arc::new(Mutex::new(entities)),
            ..Default::default()
        }
    }

    pub async fn script(&self, id: &str, script: Script) {
        self.scripts.lock().await.insert(id.to_string(), script);
    }

    pub async fn set_listing(&self, entities: Vec<Entity>) {
        *self.listing.lock().await = entities;
    }

    pub async fn calls(&self) -> Vec<(ActionKind, String)> {
        self.calls.lock().await.clone()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AdminBackend for RecordingBackend {
    async fn list(&self, _kind: &str) -> Result<Vec<Entity>> {
        Ok(self.listing.lock().await.clone())
    }

    async fn call(&self, _kind: &str, action: ActionKind, id: &EntityId) -> Result<RemoteReply> {
        self.calls
            .lock()
            .await
            .push((action, id.as_str().to_string()));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let script = self.scripts.lock().await.get(id.as_str()).cloned();
        let res = match script {
            None => Ok(RemoteReply::ok()),
            Some(Script::Reply(reply)) => Ok(reply),
            Some(Script::Fail(msg)) => Err(anyhow!(msg)),
            Some(Script::Delay(delay, reply)) => {
                tokio::time::sleep(delay).await;
                Ok(reply)
            }
            Some(Script::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(RemoteReply::ok())
            }
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        res
    }
}

pub fn ids(raw: &[&str]) -> Vec<EntityId> {
    raw.iter().map(|s| EntityId::from(*s)).collect()
}

pub fn outcome_ids(result: &backoffice_queue::ActionBatchResult) -> Vec<&str> {
    result.outcomes.iter().map(|o| o.id.as_str()).collect()
}
