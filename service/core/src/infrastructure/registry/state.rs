// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Private maps owned by the registry worker. Only ever touched from the
//! worker task, so no locking.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

const CSV_SEPARATOR: char = ',';

fn csv_entries(csv: &str) -> impl Iterator<Item = &str> {
    csv.split(CSV_SEPARATOR).filter(|entry| !entry.is_empty())
}

/// Failed logins for one username since the counter last (re)started.
#[derive(Debug, Clone, Copy)]
struct LoginFailures {
    count: u32,
    last_failure: Instant,
}

#[derive(Debug)]
pub struct RegistryState {
    sessions: HashMap<String, HashSet<String>>,
    sgi_allowlist: HashMap<String, HashSet<String>>,
    login_failures: HashMap<String, LoginFailures>,
    /// A counter with no new failure for this long no longer counts.
    login_failure_window: Duration,
}

impl RegistryState {
    pub fn new(login_failure_window: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            sgi_allowlist: HashMap::new(),
            login_failures: HashMap::new(),
            login_failure_window,
        }
    }

    fn is_current(&self, failures: &LoginFailures, now: Instant) -> bool {
        now.saturating_duration_since(failures.last_failure) < self.login_failure_window
    }

    pub fn get_session(&self, uid: &str, session_id: &str) -> bool {
        self.sessions
            .get(uid)
            .is_some_and(|ids| ids.contains(session_id))
    }

    pub fn add_session(&mut self, uid: &str, session_id: &str) {
        if uid.is_empty() || session_id.is_empty() {
            return;
        }
        self.sessions
            .entry(uid.to_string())
            .or_default()
            .insert(session_id.to_string());
    }

    /// Always acknowledges; deleting an unknown session is not an error.
    pub fn delete_session(&mut self, uid: &str, session_id: &str) -> bool {
        if let Some(ids) = self.sessions.get_mut(uid) {
            ids.remove(session_id);
            if ids.is_empty() {
                self.sessions.remove(uid);
            }
        }
        true
    }

    pub fn purge_sessions(&mut self, uid: &str) -> usize {
        self.sessions.remove(uid).map_or(0, |ids| ids.len())
    }

    pub fn check_sgi(&self, uid: &str, sgi: &str) -> bool {
        if sgi.is_empty() {
            return false;
        }
        self.sgi_allowlist
            .get(uid)
            .is_some_and(|groups| groups.contains(sgi))
    }

    pub fn allow_sgi(&mut self, uid: &str, sgi_csv: &str) {
        if uid.is_empty() {
            return;
        }
        let mut entries = csv_entries(sgi_csv).peekable();
        if entries.peek().is_none() {
            return;
        }
        self.sgi_allowlist
            .entry(uid.to_string())
            .or_default()
            .extend(entries.map(str::to_string));
    }

    pub fn revoke_sgi(&mut self, uid: &str, sgi_csv: &str) {
        if let Some(groups) = self.sgi_allowlist.get_mut(uid) {
            for sgi in csv_entries(sgi_csv) {
                groups.remove(sgi);
            }
            if groups.is_empty() {
                self.sgi_allowlist.remove(uid);
            }
        }
    }

    /// Count one more failure. A counter whose window has lapsed starts over.
    pub fn record_login_failure(&mut self, username: &str, now: Instant) -> u32 {
        if username.is_empty() {
            return 0;
        }
        let count = match self.login_failures.get(username) {
            Some(failures) if self.is_current(failures, now) => failures.count.saturating_add(1),
            _ => 1,
        };
        self.login_failures.insert(
            username.to_string(),
            LoginFailures {
                count,
                last_failure: now,
            },
        );
        count
    }

    pub fn login_failure_count(&self, username: &str, now: Instant) -> u32 {
        self.login_failures
            .get(username)
            .filter(|failures| self.is_current(failures, now))
            .map_or(0, |failures| failures.count)
    }

    /// Drop counters whose window has lapsed. Returns how many were removed.
    pub fn prune_login_failures(&mut self, now: Instant) -> usize {
        let window = self.login_failure_window;
        let before = self.login_failures.len();
        self.login_failures
            .retain(|_, failures| now.saturating_duration_since(failures.last_failure) < window);
        before - self.login_failures.len()
    }

    pub fn tracked_login_failures(&self) -> usize {
        self.login_failures.len()
    }

    pub fn reset_login_failures(&mut self, username: &str) {
        self.login_failures.remove(username);
    }

    pub fn active_session_count(&self) -> usize {
        self.sessions.values().map(HashSet::len).sum()
    }
}
