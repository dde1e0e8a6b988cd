//! In-memory partition topology.
//!
//! [`PartitionRegistry`] tracks which partition servers are currently
//! running. The `main` partition is this process itself; it is seeded at
//! construction and can never be removed. Additional partitions are
//! registered and removed through the admin endpoints, and every change is
//! broadcast to connected clients as a fresh topology snapshot.

use std::collections::HashMap;

use tokio::sync::RwLock;

use filehub_core::locking::MAIN_PARTITION;
use filehub_core::protocol::PartitionInfo;

/// Thread-safe registry of running partitions, keyed by partition id.
pub struct PartitionRegistry {
    partitions: RwLock<HashMap<String, PartitionInfo>>,
}

impl PartitionRegistry {
    /// Create a registry seeded with the `main` partition at the given
    /// bind address.
    pub fn new(host: &str, port: u16) -> Self {
        let main = PartitionInfo {
            id: MAIN_PARTITION.to_string(),
            name: "Main".to_string(),
            host: host.to_string(),
            port,
            lat: None,
            lng: None,
        };
        let mut partitions = HashMap::new();
        partitions.insert(main.id.clone(), main);
        Self {
            partitions: RwLock::new(partitions),
        }
    }

    /// Register (or replace) a partition. Returns the previous entry with
    /// the same id, if any.
    pub async fn register(&self, info: PartitionInfo) -> Option<PartitionInfo> {
        self.partitions
            .write()
            .await
            .insert(info.id.clone(), info)
    }

    /// Remove a partition by id. The `main` partition cannot be removed.
    pub async fn remove(&self, partition_id: &str) -> Option<PartitionInfo> {
        if partition_id == MAIN_PARTITION {
            return None;
        }
        self.partitions.write().await.remove(partition_id)
    }

    /// Remove the partition listening on `port`, if one is registered.
    /// The `main` partition is never matched.
    pub async fn remove_by_port(&self, port: u16) -> Option<PartitionInfo> {
        let mut partitions = self.partitions.write().await;
        let id = partitions
            .iter()
            .find(|(id, p)| p.port == port && id.as_str() != MAIN_PARTITION)
            .map(|(id, _)| id.clone())?;
        partitions.remove(&id)
    }

    /// Look up a partition by id.
    pub async fn get(&self, partition_id: &str) -> Option<PartitionInfo> {
        self.partitions.read().await.get(partition_id).cloned()
    }

    /// Whether the partition is currently running. `main` is always
    /// running (it is this process).
    pub async fn is_running(&self, partition_id: &str) -> bool {
        if partition_id == MAIN_PARTITION {
            return true;
        }
        self.partitions.read().await.contains_key(partition_id)
    }

    /// The current topology, `main` first and the rest ordered by id.
    pub async fn list(&self) -> Vec<PartitionInfo> {
        let partitions = self.partitions.read().await;
        let mut list: Vec<PartitionInfo> = partitions.values().cloned().collect();
        list.sort_by(|a, b| {
            let a_main = a.id == MAIN_PARTITION;
            let b_main = b.id == MAIN_PARTITION;
            b_main.cmp(&a_main).then_with(|| a.id.cmp(&b.id))
        });
        list
    }

    /// The number of registered partitions (including `main`).
    pub async fn count(&self) -> usize {
        self.partitions.read().await.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn partition(id: &str, port: u16) -> PartitionInfo {
        PartitionInfo {
            id: id.to_string(),
            name: format!("Server-{port}"),
            host: "127.0.0.1".to_string(),
            port,
            lat: Some(52.52),
            lng: Some(13.405),
        }
    }

    #[tokio::test]
    async fn main_partition_is_seeded_and_always_running() {
        let registry = PartitionRegistry::new("0.0.0.0", 3000);

        assert!(registry.is_running(MAIN_PARTITION).await);
        assert_eq!(registry.count().await, 1);

        let main = registry.get(MAIN_PARTITION).await.unwrap();
        assert_eq!(main.port, 3000);
    }

    #[tokio::test]
    async fn main_partition_cannot_be_removed() {
        let registry = PartitionRegistry::new("0.0.0.0", 3000);

        assert!(registry.remove(MAIN_PARTITION).await.is_none());
        assert!(registry.remove_by_port(3000).await.is_none());
        assert!(registry.is_running(MAIN_PARTITION).await);
    }

    #[tokio::test]
    async fn register_and_remove_round_trip() {
        let registry = PartitionRegistry::new("0.0.0.0", 3000);

        registry.register(partition("server-5001", 5001)).await;
        assert!(registry.is_running("server-5001").await);
        assert_eq!(registry.count().await, 2);

        let removed = registry.remove("server-5001").await.unwrap();
        assert_eq!(removed.port, 5001);
        assert!(!registry.is_running("server-5001").await);
    }

    #[tokio::test]
    async fn remove_by_port_matches_only_registered_partitions() {
        let registry = PartitionRegistry::new("0.0.0.0", 3000);
        registry.register(partition("server-5001", 5001)).await;

        assert!(registry.remove_by_port(5002).await.is_none());

        let removed = registry.remove_by_port(5001).await.unwrap();
        assert_eq!(removed.id, "server-5001");
    }

    #[tokio::test]
    async fn unknown_partition_is_not_running() {
        let registry = PartitionRegistry::new("0.0.0.0", 3000);
        assert!(!registry.is_running("server-9999").await);
    }

    #[tokio::test]
    async fn list_puts_main_first_then_sorts_by_id() {
        let registry = PartitionRegistry::new("0.0.0.0", 3000);
        registry.register(partition("server-5002", 5002)).await;
        registry.register(partition("server-5001", 5001)).await;

        let ids: Vec<String> = registry.list().await.into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["main", "server-5001", "server-5002"]);
    }
}
