//! An in-memory stand-in for the external commerce platform.
//!
//! It applies adjustments to its own quantities, and queues the absolute-level notifications that a real platform
//! would push back to the gateway. Individual items can be made to fail, or to hang until the caller times out.
use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{Arc, Mutex},
};

use chrono::Utc;

use crate::{
    db_types::ExternalLink,
    sse_api::sync_objects::InventoryLevelUpdate,
    traits::{AdjustmentRequest, AdjustmentResponse, InventoryPlatform, PlatformError},
};

#[derive(Debug, Default)]
struct FakeState {
    levels: HashMap<(String, String), i64>,
    failing: HashSet<String>,
    stalled: HashSet<String>,
    unreachable: bool,
    notifications: VecDeque<(String, InventoryLevelUpdate)>,
    adjustments: Vec<AdjustmentRequest>,
    level_queries: usize,
    next_event: u64,
}

#[derive(Debug, Clone, Default)]
pub struct FakePlatform {
    state: Arc<Mutex<FakeState>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_level(&self, item: &str, location: &str, available: i64) {
        self.state.lock().unwrap().levels.insert((item.to_string(), location.to_string()), available);
    }

    pub fn level(&self, item: &str, location: &str) -> Option<i64> {
        self.state.lock().unwrap().levels.get(&(item.to_string(), location.to_string())).copied()
    }

    /// Adjustments and level queries for `item` are rejected.
    pub fn fail_item(&self, item: &str) {
        self.state.lock().unwrap().failing.insert(item.to_string());
    }

    /// Undoes [`Self::fail_item`] and [`Self::stall_item`].
    pub fn heal_item(&self, item: &str) {
        let mut state = self.state.lock().unwrap();
        state.failing.remove(item);
        state.stalled.remove(item);
    }

    /// Adjustments for `item` never complete.
    pub fn stall_item(&self, item: &str) {
        self.state.lock().unwrap().stalled.insert(item.to_string());
    }

    /// Every call fails as if the network were down.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().unwrap().unreachable = unreachable;
    }

    /// Drains the queued notifications. Each comes with the event id the platform would have sent.
    pub fn take_notifications(&self) -> Vec<(String, InventoryLevelUpdate)> {
        self.state.lock().unwrap().notifications.drain(..).collect()
    }

    pub fn adjustments(&self) -> Vec<AdjustmentRequest> {
        self.state.lock().unwrap().adjustments.clone()
    }

    pub fn level_queries(&self) -> usize {
        self.state.lock().unwrap().level_queries
    }

    fn check_reachable(&self, item: &str) -> Result<bool, PlatformError> {
        let state = self.state.lock().unwrap();
        if state.unreachable {
            return Err(PlatformError::Unavailable("connection refused".into()));
        }
        if state.failing.contains(item) {
            return Err(PlatformError::Rejected(format!("item {item} cannot be adjusted")));
        }
        Ok(state.stalled.contains(item))
    }
}

impl InventoryPlatform for FakePlatform {
    async fn adjust_available(&self, request: &AdjustmentRequest) -> Result<AdjustmentResponse, PlatformError> {
        let stalled = self.check_reachable(&request.link.item_ref)?;
        if stalled {
            futures_util::future::pending::<()>().await;
        }
        let mut state = self.state.lock().unwrap();
        let key = (request.link.item_ref.clone(), request.link.location_ref.clone());
        let level = state.levels.get(&key).copied().ok_or_else(|| PlatformError::NotFound(request.link.to_string()))?;
        let new_level = level + request.delta;
        state.levels.insert(key, new_level);
        state.adjustments.push(request.clone());
        state.next_event += 1;
        let event_id = format!("evt_{}", state.next_event);
        let update = InventoryLevelUpdate {
            external_item_ref: request.link.item_ref.clone(),
            external_location_ref: request.link.location_ref.clone(),
            available: new_level,
            updated_at: Some(Utc::now()),
        };
        state.notifications.push_back((event_id, update));
        Ok(AdjustmentResponse { new_quantity: Some(new_level) })
    }

    async fn fetch_available(&self, link: &ExternalLink) -> Result<i64, PlatformError> {
        self.check_reachable(&link.item_ref)?;
        let mut state = self.state.lock().unwrap();
        state.level_queries += 1;
        state
            .levels
            .get(&(link.item_ref.clone(), link.location_ref.clone()))
            .copied()
            .ok_or_else(|| PlatformError::NotFound(link.to_string()))
    }
}
