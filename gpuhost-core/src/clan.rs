//! Clan membership: a host node plus admitted workers.
//!
//! The registry moves one way, `unformed → formed`. Membership only grows;
//! there is no leave or heartbeat expiry.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::compat::check_compatibility;
use crate::error::ClanError;
use crate::hardware::HardwareDescriptor;
use crate::id::{ClanId, Credential, NodeId};

/// Role of a node within a clan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum NodeRole {
    Host,
    Worker,
}

/// Liveness of a node. Nodes are admitted active and never transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum NodeStatus {
    #[default]
    Active,
}

/// A registered clan member.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Node {
    pub id: NodeId,
    pub role: NodeRole,
    /// Display name, e.g. `"SystemA"`.
    pub name: String,
    /// Address other members and clients reach this node at.
    pub url: String,
    pub hardware: HardwareDescriptor,
    pub status: NodeStatus,
    /// Reserved for liveness tracking; nothing updates it yet.
    pub last_heartbeat: Option<DateTime<Utc>>,
}

/// What a prospective member reports about itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct NodeSpec {
    pub name: String,
    pub url: String,
    pub hardware: HardwareDescriptor,
}

impl NodeSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>, hardware: HardwareDescriptor) -> Self {
        Self { name: name.into(), url: url.into(), hardware }
    }

    fn into_node(self, id: NodeId, role: NodeRole) -> Node {
        Node {
            id,
            role,
            name: self.name,
            url: self.url,
            hardware: self.hardware,
            status: NodeStatus::Active,
            last_heartbeat: None,
        }
    }
}

/// Credentials handed out once, when the clan is formed.
#[derive(Debug, Clone, Serialize)]
#[non_exhaustive]
pub struct ClanKeys {
    pub clan_id: ClanId,
    pub host_id: NodeId,
    pub admin_key: Credential,
    pub worker_key: Credential,
    pub client_key: Credential,
}

/// Which clan credential a presented token matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ClanRole {
    Admin,
    WorkerJoin,
    ClientAccess,
}

/// Aggregated capacity of the clan, as reported to clients.
#[derive(Debug, Clone, Serialize)]
#[non_exhaustive]
pub struct ClanStats {
    pub clan_id: Option<ClanId>,
    /// Sum of every member's total memory, in bytes.
    pub total_memory: u64,
    pub active_nodes: usize,
    pub nodes: Vec<Node>,
}

#[derive(Debug)]
struct Clan {
    id: ClanId,
    host_id: NodeId,
    nodes: IndexMap<NodeId, Node>,
    admin_key: Credential,
    worker_key: Credential,
    client_key: Credential,
}

/// Thread-safe clan membership registry.
#[derive(Debug, Default)]
pub struct ClanRegistry {
    clan: Mutex<Option<Clan>>,
}

impl ClanRegistry {
    /// Creates an unformed registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forms a clan with `host` as its first member and generates its keys.
    ///
    /// # Errors
    /// Returns [`ClanError::AlreadyFormed`] if a clan exists; no new keys are
    /// generated in that case.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn form(&self, host_id: NodeId, host: NodeSpec) -> Result<ClanKeys, ClanError> {
        #[expect(clippy::expect_used, reason = "lock poisoning is unrecoverable")]
        let mut slot = self.clan.lock().expect("clan registry mutex poisoned");
        if let Some(existing) = slot.as_ref() {
            return Err(ClanError::AlreadyFormed { clan_id: existing.id.to_string() });
        }

        let host = host.into_node(host_id.clone(), NodeRole::Host);
        let mut nodes = IndexMap::new();
        nodes.insert(host_id.clone(), host);

        let clan = Clan {
            id: ClanId::new(),
            host_id,
            nodes,
            admin_key: Credential::generate(),
            worker_key: Credential::generate(),
            client_key: Credential::generate(),
        };
        let keys = ClanKeys {
            clan_id: clan.id,
            host_id: clan.host_id.clone(),
            admin_key: clan.admin_key.clone(),
            worker_key: clan.worker_key.clone(),
            client_key: clan.client_key.clone(),
        };
        tracing::info!(clan_id = %clan.id, host_id = %clan.host_id, "clan formed");
        *slot = Some(clan);
        Ok(keys)
    }

    /// Admits `candidate` as a worker if its hardware matches the host.
    ///
    /// # Errors
    /// Returns [`ClanError::NotFormed`] before [`form`](Self::form), or
    /// [`ClanError::Incompatible`] naming the first failed check. The
    /// membership is unchanged on error.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn admit_worker(&self, candidate: NodeSpec) -> Result<NodeId, ClanError> {
        #[expect(clippy::expect_used, reason = "lock poisoning is unrecoverable")]
        let mut slot = self.clan.lock().expect("clan registry mutex poisoned");
        let clan = slot.as_mut().ok_or(ClanError::NotFormed)?;
        let host = clan.nodes.get(&clan.host_id).ok_or(ClanError::NotFormed)?;

        if let Err(reason) = check_compatibility(&host.hardware, &candidate.hardware) {
            tracing::warn!(worker = %candidate.name, %reason, "worker rejected");
            return Err(reason.into());
        }

        let id = loop {
            let id = NodeId::generate("worker");
            if !clan.nodes.contains_key(&id) {
                break id;
            }
        };
        tracing::info!(worker = %candidate.name, node_id = %id, "worker joined clan");
        clan.nodes.insert(id.clone(), candidate.into_node(id.clone(), NodeRole::Worker));
        Ok(id)
    }

    /// Sums memory across members. Empty when no clan is formed.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn aggregate(&self) -> ClanStats {
        #[expect(clippy::expect_used, reason = "lock poisoning is unrecoverable")]
        let slot = self.clan.lock().expect("clan registry mutex poisoned");
        match slot.as_ref() {
            None => ClanStats { clan_id: None, total_memory: 0, active_nodes: 0, nodes: Vec::new() },
            Some(clan) => ClanStats {
                clan_id: Some(clan.id),
                total_memory: clan.nodes.values().map(|n| n.hardware.memory_total).sum(),
                active_nodes: clan.nodes.len(),
                nodes: clan.nodes.values().cloned().collect(),
            },
        }
    }

    /// Resolves `token` to the clan credential it matches, if any.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn role_for(&self, token: &str) -> Option<ClanRole> {
        #[expect(clippy::expect_used, reason = "lock poisoning is unrecoverable")]
        let slot = self.clan.lock().expect("clan registry mutex poisoned");
        let clan = slot.as_ref()?;
        let role = [
            (&clan.admin_key, ClanRole::Admin),
            (&clan.worker_key, ClanRole::WorkerJoin),
            (&clan.client_key, ClanRole::ClientAccess),
        ]
        .into_iter()
        .find(|(key, _)| key.matches(token))
        .map(|(_, role)| role);
        role
    }

    /// Returns `true` once [`form`](Self::form) has succeeded.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn is_formed(&self) -> bool {
        #[expect(clippy::expect_used, reason = "lock poisoning is unrecoverable")]
        let slot = self.clan.lock().expect("clan registry mutex poisoned");
        slot.is_some()
    }
}
