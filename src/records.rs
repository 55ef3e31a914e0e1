use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CardError;

/// A user's sign-in record as the card sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignUser {
    pub user_id: String,
    pub platform: String,
    /// Current affinity score.
    pub impression: f64,
    pub sign_count: u32,
    /// Linked console account, shown as the card's UID.
    #[serde(default)]
    pub console_uid: Option<u64>,
}

impl SignUser {
    pub fn new(user_id: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            platform: platform.into(),
            impression: 0.0,
            sign_count: 0,
            console_uid: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignLog {
    pub user_id: String,
    pub create_time: DateTime<Utc>,
}

// Read-only queries the view card needs beyond the user itself.
pub trait SignRecords {
    /// 1-based position by descending impression.
    fn impression_rank(&self, user_id: &str) -> Option<usize>;

    /// Most recent sign-in.
    fn last_sign_time(&self, user_id: &str) -> Option<DateTime<Utc>>;
}

/// Users and sign logs held in memory, loadable from a JSON dump.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryRecords {
    #[serde(default)]
    pub users: Vec<SignUser>,
    #[serde(default)]
    pub logs: Vec<SignLog>,
}

impl MemoryRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, CardError> {
        let raw = fs::read_to_string(path).map_err(CardError::io(path))?;
        serde_json::from_str(&raw).map_err(|source| CardError::Records {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), CardError> {
        let raw = serde_json::to_string_pretty(self).map_err(|source| CardError::Records {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, raw).map_err(CardError::io(path))
    }

    /// Insert or replace by `user_id`.
    pub fn upsert_user(&mut self, user: SignUser) {
        match self.users.iter_mut().find(|u| u.user_id == user.user_id) {
            Some(slot) => *slot = user,
            None => self.users.push(user),
        }
    }

    pub fn user(&self, user_id: &str) -> Option<&SignUser> {
        self.users.iter().find(|u| u.user_id == user_id)
    }

    /// Apply a sign-in: add `delta` affinity, bump the count, log it.
    pub fn record_sign(
        &mut self,
        user_id: &str,
        delta: f64,
        at: DateTime<Utc>,
    ) -> Result<SignUser, CardError> {
        let user = self
            .users
            .iter_mut()
            .find(|u| u.user_id == user_id)
            .ok_or_else(|| CardError::UnknownUser(user_id.to_string()))?;
        user.impression += delta;
        user.sign_count += 1;
        let updated = user.clone();
        self.logs.push(SignLog {
            user_id: user_id.to_string(),
            create_time: at,
        });
        Ok(updated)
    }
}

impl SignRecords for MemoryRecords {
    fn impression_rank(&self, user_id: &str) -> Option<usize> {
        let mut ordered: Vec<&SignUser> = self.users.iter().collect();
        // stable, so ties keep insertion order
        ordered.sort_by(|a, b| b.impression.total_cmp(&a.impression));
        ordered
            .iter()
            .position(|u| u.user_id == user_id)
            .map(|i| i + 1)
    }

    fn last_sign_time(&self, user_id: &str) -> Option<DateTime<Utc>> {
        self.logs
            .iter()
            .filter(|l| l.user_id == user_id)
            .map(|l| l.create_time)
            .max()
    }
}
