//! Connection pool management.
//!
//! # Responsibilities
//! - Own the ordered set of known connections
//! - Expose alive / dead / resurrect-candidate views
//! - Apply health transitions requested by the transport
//! - Reconcile sniffed topology into the pool

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::config::hosts::{HostConfig, HostParseError};
use crate::observability::metrics;
use crate::pool::connection::{Connection, ConnectionId, HealthState};
use crate::resilience::backoff::ResurrectBackoff;
use crate::sniffer::SniffError;

/// How sniffed hosts are merged into the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcilePolicy {
    /// Drop connections the cluster no longer reports.
    #[default]
    Replace,
    /// Only add newly reported connections.
    Additive,
}

/// Summary of a reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub added: Vec<ConnectionId>,
    pub removed: Vec<ConnectionId>,
    pub retained: usize,
}

impl ReconcileReport {
    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// The shared set of cluster connections.
///
/// Membership is an immutable snapshot swapped on change, so readers never
/// block. Health lives behind a per-connection lock held only for the update.
#[derive(Debug)]
pub struct ConnectionPool {
    connections: ArcSwap<Vec<Arc<Connection>>>,
    /// Serializes membership changes.
    write_lock: Mutex<()>,
    backoff: ResurrectBackoff,
}

impl ConnectionPool {
    pub fn new(backoff: ResurrectBackoff) -> Self {
        Self {
            connections: ArcSwap::from_pointee(Vec::new()),
            write_lock: Mutex::new(()),
            backoff,
        }
    }

    /// Create a pool seeded with `hosts`, skipping duplicates.
    pub fn from_hosts(hosts: &[HostConfig], backoff: ResurrectBackoff) -> Result<Self, HostParseError> {
        let pool = Self::new(backoff);
        for host in hosts {
            pool.add(Connection::new(host)?);
        }
        Ok(pool)
    }

    /// Insert a connection unless one with the same identity exists.
    ///
    /// Returns the pooled connection and whether it was newly inserted.
    pub fn add(&self, connection: Connection) -> (Arc<Connection>, bool) {
        let _guard = self.write_lock.lock();
        let current = self.connections.load();
        if let Some(existing) = current.iter().find(|c| c.id() == connection.id()) {
            return (existing.clone(), false);
        }

        let connection = Arc::new(connection);
        let mut next = Vec::with_capacity(current.len() + 1);
        next.extend(current.iter().cloned());
        next.push(connection.clone());
        self.connections.store(Arc::new(next));
        metrics::set_alive_connections(self.count_alive());
        (connection, true)
    }

    /// Remove a connection by identity.
    pub fn remove(&self, id: &ConnectionId) -> Option<Arc<Connection>> {
        let _guard = self.write_lock.lock();
        let current = self.connections.load();
        let removed = current.iter().find(|c| c.id() == id).cloned()?;
        let next: Vec<_> = current.iter().filter(|c| c.id() != id).cloned().collect();
        self.connections.store(Arc::new(next));
        metrics::set_alive_connections(self.count_alive());
        Some(removed)
    }

    pub fn get(&self, id: &ConnectionId) -> Option<Arc<Connection>> {
        self.connections.load().iter().find(|c| c.id() == id).cloned()
    }

    /// Every connection, in pool order.
    pub fn all(&self) -> Vec<Arc<Connection>> {
        self.connections.load().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.connections.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.load().is_empty()
    }

    /// Connections currently in rotation, in pool order.
    pub fn alive(&self) -> Vec<Arc<Connection>> {
        self.connections
            .load()
            .iter()
            .filter(|c| c.is_alive())
            .cloned()
            .collect()
    }

    /// Connections out of rotation (dead or resurrect candidates), in pool order.
    pub fn dead(&self) -> Vec<Arc<Connection>> {
        self.connections
            .load()
            .iter()
            .filter(|c| !c.is_alive())
            .cloned()
            .collect()
    }

    /// Dead connections whose resurrection time has passed, fewest failures first.
    pub fn resurrect_candidates(&self) -> Vec<Arc<Connection>> {
        let now = Instant::now();
        let mut candidates: Vec<_> = self
            .connections
            .load()
            .iter()
            .filter(|c| c.promote_if_due(now))
            .cloned()
            .collect();
        candidates.sort_by_key(|c| c.failures());
        candidates
    }

    /// The list a selector should pick from.
    ///
    /// Alive connections, falling back to resurrect candidates when none are
    /// alive. With `eager` set, candidates are appended after alive ones.
    pub fn selection_candidates(&self, eager: bool) -> Vec<Arc<Connection>> {
        let mut alive = self.alive();
        if alive.is_empty() {
            return self.resurrect_candidates();
        }
        if eager {
            alive.extend(self.resurrect_candidates());
        }
        alive
    }

    /// Take a connection out of rotation and schedule its resurrection.
    pub fn mark_dead(&self, connection: &Connection) {
        let failures = connection.mark_dead(&self.backoff);
        tracing::warn!(
            host = %connection,
            failures,
            resurrect_in = ?self.backoff.delay(failures),
            "Connection marked dead"
        );
        metrics::record_connection_dead(&connection.to_string());
        metrics::set_alive_connections(self.count_alive());
    }

    /// Put a connection back into rotation.
    pub fn mark_alive(&self, connection: &Connection) {
        if connection.mark_alive() {
            tracing::info!(
                host = %connection,
                failures = connection.failures(),
                "Connection resurrected"
            );
            metrics::set_alive_connections(self.count_alive());
        }
    }

    /// Merge a discovered host list into the pool.
    ///
    /// Known nodes keep their connection (and so their health and failure
    /// history); new nodes join alive; with [`ReconcilePolicy::Replace`],
    /// nodes missing from `discovered` are dropped.
    ///
    /// Fails with [`SniffError::Empty`] and leaves the pool untouched when no
    /// discovered host yields a usable connection.
    pub fn reconcile(
        &self,
        discovered: &[HostConfig],
        policy: ReconcilePolicy,
    ) -> Result<ReconcileReport, SniffError> {
        let _guard = self.write_lock.lock();
        let current = self.connections.load();
        let existing: HashMap<&ConnectionId, &Arc<Connection>> =
            current.iter().map(|c| (c.id(), c)).collect();

        let mut report = ReconcileReport::default();
        let mut seen: HashSet<ConnectionId> = HashSet::new();
        let mut reported = Vec::with_capacity(discovered.len());

        for host in discovered {
            let id = ConnectionId::from(host);
            if !seen.insert(id.clone()) {
                continue;
            }
            match existing.get(&id) {
                Some(connection) => {
                    report.retained += 1;
                    reported.push((*connection).clone());
                }
                None => match Connection::new(host) {
                    Ok(connection) => {
                        report.added.push(id);
                        reported.push(Arc::new(connection));
                    }
                    Err(e) => {
                        tracing::warn!(host = %id, error = %e, "Skipping unusable sniffed host");
                    }
                },
            }
        }

        if reported.is_empty() {
            tracing::warn!(
                discovered = discovered.len(),
                "No usable host in sniffed topology, keeping current pool"
            );
            return Err(SniffError::Empty);
        }

        let next = match policy {
            ReconcilePolicy::Replace => {
                report.removed = current
                    .iter()
                    .filter(|c| !seen.contains(c.id()))
                    .map(|c| c.id().clone())
                    .collect();
                reported
            }
            ReconcilePolicy::Additive => {
                let mut next: Vec<_> = current.iter().cloned().collect();
                next.extend(reported.into_iter().filter(|c| !existing.contains_key(c.id())));
                next
            }
        };

        self.connections.store(Arc::new(next));
        metrics::set_alive_connections(self.count_alive());
        Ok(report)
    }

    fn count_alive(&self) -> usize {
        self.connections.load().iter().filter(|c| c.is_alive()).count()
    }

    /// Health state for every connection, in pool order.
    pub fn states(&self) -> Vec<(ConnectionId, HealthState, u32)> {
        self.connections
            .load()
            .iter()
            .map(|c| {
                let health = c.health();
                (c.id().clone(), health.state, health.failures)
            })
            .collect()
    }
}

impl Default for ConnectionPool {
    fn default() -> Self {
        Self::new(ResurrectBackoff::default())
    }
}
