use std::collections::HashMap;
use std::sync::RwLock;

use crate::models::{NotificationDetails, Subscriber};

/// In-memory registry of frame users who opted into notifications, keyed by
/// Farcaster fid. Constructed at startup and passed by reference; contents are
/// lost on process restart. Duplicate adds overwrite by fid, removes are
/// no-ops for unknown fids.
#[derive(Default)]
pub struct SubscriberRegistry {
    inner: RwLock<HashMap<i64, NotificationDetails>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, fid: i64, details: NotificationDetails) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.insert(fid, details);
    }

    pub fn remove(&self, fid: i64) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.remove(&fid).is_some()
    }

    pub fn all(&self) -> Vec<Subscriber> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner
            .iter()
            .map(|(fid, details)| Subscriber {
                fid: *fid,
                notification_details: details.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
