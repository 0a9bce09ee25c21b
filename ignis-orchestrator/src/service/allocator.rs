//! Host allocation
//!
//! In-memory registry of which backend host each runner lives on, with a
//! least-loaded selection policy. This state is the only thing correlating
//! a queued event's create with the later completed event's delete, and it
//! does not survive a restart: a runner in flight across a restart leaves
//! its VM behind for manual cleanup. That is an accepted limitation.
//!
//! Handlers run concurrently, so every operation takes the one internal
//! lock for its whole critical section. Nothing here performs I/O.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AllocError {
    #[error("no backend hosts configured")]
    NoHosts,

    #[error("host for runner {0} not found")]
    NotAssigned(String),
}

/// Assigns runners to backend hosts and remembers the mapping
#[derive(Debug)]
pub struct HostAllocator {
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    hosts: Vec<String>,
    /// runner name -> host address
    assigned: HashMap<String, String>,
    /// host address -> active assignment count
    load: HashMap<String, usize>,
}

impl HostAllocator {
    pub fn new(hosts: Vec<String>) -> Self {
        let load = hosts.iter().map(|h| (h.clone(), 0)).collect();

        Self {
            inner: Mutex::new(Inner {
                hosts,
                assigned: HashMap::new(),
                load,
            }),
        }
    }

    /// Pick a host for a new runner and record the assignment.
    ///
    /// Single-host pools short-circuit; otherwise the host with the fewest
    /// active assignments wins, ties broken by lexicographic address order
    /// so selection is reproducible. Assigning the same name twice without
    /// an unassign in between is a caller error (runner names are unique
    /// per job execution).
    pub fn assign(&self, name: &str) -> Result<String, AllocError> {
        let mut inner = self.lock();

        let host = match inner.hosts.len() {
            // unreachable if startup validation ran, but checked anyway
            0 => return Err(AllocError::NoHosts),
            1 => inner.hosts[0].clone(),
            _ => inner.least_loaded(),
        };

        inner.assigned.insert(name.to_string(), host.clone());
        *inner.load.entry(host.clone()).or_insert(0) += 1;

        Ok(host)
    }

    /// Find the host a runner was assigned to.
    pub fn lookup(&self, name: &str) -> Result<String, AllocError> {
        self.lock()
            .assigned
            .get(name)
            .cloned()
            .ok_or_else(|| AllocError::NotAssigned(name.to_string()))
    }

    /// Drop the record of a runner and release its slot on the host.
    ///
    /// Unknown names are a no-op: cleanup is best-effort and must never
    /// fail or disturb other hosts' counters.
    pub fn unassign(&self, name: &str) {
        let mut inner = self.lock();

        if let Some(host) = inner.assigned.remove(name) {
            if let Some(count) = inner.load.get_mut(&host) {
                *count = count.saturating_sub(1);
            }
        }
    }

    // A poisoned lock means another handler panicked mid-operation; the
    // maps stay usable, so carry on rather than propagating the panic.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Inner {
    fn least_loaded(&self) -> String {
        let mut hosts: Vec<&String> = self.hosts.iter().collect();
        hosts.sort();

        hosts
            .into_iter()
            .min_by_key(|h| self.load.get(*h).copied().unwrap_or(0))
            .cloned()
            // hosts is non-empty here, assign checks before calling
            .unwrap_or_default()
    }
}
