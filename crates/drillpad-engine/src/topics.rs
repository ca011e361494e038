use serde::{Deserialize, Serialize};

use crate::turn::{DiagramChange, DiagramNode};

/// The fixed topic tags a diagram node can map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Cache,
    Lb,
    Queue,
    Shard,
    Database,
    Storage,
    Cdn,
    Default,
}

impl Topic {
    /// Classify a node label. Matching order mirrors the component registry:
    /// cache, load balancer, queue, shard, database, storage, cdn, default.
    pub fn from_label(label: &str) -> Self {
        let norm = normalize_label(label);
        if norm.contains("cache") {
            Topic::Cache
        } else if norm.contains("load") || norm.contains("balancer") || norm == "lb" {
            Topic::Lb
        } else if norm.contains("queue") || norm.contains("mq") {
            Topic::Queue
        } else if norm.contains("shard") || norm.contains("sharding") {
            Topic::Shard
        } else if norm.contains("database") || norm.contains("db") {
            Topic::Database
        } else if norm.contains("storage") || norm.contains("s3") {
            Topic::Storage
        } else if norm.contains("cdn") {
            Topic::Cdn
        } else {
            Topic::Default
        }
    }

    pub fn from_node(node: &DiagramNode) -> Self {
        Self::from_label(node.display_label())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Cache => "cache",
            Topic::Lb => "lb",
            Topic::Queue => "queue",
            Topic::Shard => "shard",
            Topic::Database => "database",
            Topic::Storage => "storage",
            Topic::Cdn => "cdn",
            Topic::Default => "default",
        }
    }

    /// Retrieval keywords for drilling into this topic.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Topic::Cache => &[
                "caching",
                "ttl",
                "invalidation",
                "stampede",
                "consistency",
                "write-through",
                "write-back",
            ],
            Topic::Lb => &[
                "load-balancing",
                "health-checks",
                "l4-vs-l7",
                "overload",
                "retries",
                "routing",
            ],
            Topic::Queue => &[
                "queue",
                "delivery-semantics",
                "dlq",
                "idempotency",
                "backpressure",
                "at-least-once",
            ],
            Topic::Shard => &[
                "sharding",
                "hot-partitions",
                "resharding",
                "partition-key",
                "replication-lag",
            ],
            Topic::Database => &[
                "sharding",
                "hot-partitions",
                "replication-lag",
                "failover",
                "primary-replica",
            ],
            Topic::Storage => &["object-storage", "cdn", "cache-invalidation", "edge"],
            Topic::Cdn => &["cdn", "cache-invalidation", "edge", "origin"],
            Topic::Default => GENERIC_TOPICS,
        }
    }
}

const GENERIC_TOPICS: &[&str] = &["tradeoffs", "failure-modes", "metrics"];
const CONNECT_TOPICS: &[&str] = &["consistency", "write-path", "ordering", "data-flow"];
const DELETE_TOPICS: &[&str] = &["failure-modes", "downtime", "migration"];

/// Fold synonyms and collapse whitespace so label variants compare equal.
pub fn normalize_label(label: &str) -> String {
    let s = label.trim().to_lowercase();
    match s.as_str() {
        "load balancer" | "load-balancer" => "lb".to_string(),
        "message queue" | "message-queue" => "queue".to_string(),
        "object storage" | "object-storage" => "storage".to_string(),
        _ => s.split_whitespace().collect::<Vec<_>>().join("-"),
    }
}

/// Topic keyword list seeding the retrieval query for a diagram change.
pub fn topics_for_change(change: Option<&DiagramChange>) -> &'static [&'static str] {
    match change {
        Some(DiagramChange::AddNode(node)) => Topic::from_node(node).keywords(),
        Some(DiagramChange::Connect { .. }) => CONNECT_TOPICS,
        Some(DiagramChange::DeleteNode { .. }) | Some(DiagramChange::DeleteEdge { .. }) => {
            DELETE_TOPICS
        }
        _ => GENERIC_TOPICS,
    }
}

/// Deterministic one-line summary of the change, used for display and as
/// retrieval-query seed text.
pub fn action_summary(change: Option<&DiagramChange>) -> String {
    match change {
        Some(DiagramChange::AddNode(node)) => {
            let label = node.display_label();
            if label.is_empty() {
                "Added node".to_string()
            } else {
                format!("Added {label}")
            }
        }
        Some(DiagramChange::Connect { source, target }) => {
            format!("Connected {source} -> {target}")
        }
        Some(DiagramChange::DeleteNode { .. }) => "Deleted node".to_string(),
        Some(DiagramChange::DeleteEdge { .. }) => "Deleted edge".to_string(),
        _ => "Diagram change".to_string(),
    }
}

/// Which component types are flagged when duplicated, and from which count.
///
/// A second instance of a stateful component can be legitimate (sharding); a
/// third is almost always accidental. The threshold is configurable because
/// that asymmetry does not fit every component type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NoOpPolicy {
    /// Flag an add when at least this many same-type nodes already exist.
    pub min_existing: usize,
    pub duplicate_prone: Vec<String>,
}

impl Default for NoOpPolicy {
    fn default() -> Self {
        Self {
            min_existing: 2,
            duplicate_prone: [
                "client",
                "cache",
                "database",
                "db",
                "load-balancer",
                "lb",
                "message-queue",
                "queue",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// An `addNode` is a no-op when the diagram already holds enough same-type
/// nodes and the type is duplicate-prone. Labels compare fuzzily: equality,
/// or substring containment either way once the label has 3+ chars.
pub fn is_no_op(
    change: Option<&DiagramChange>,
    nodes: &[DiagramNode],
    policy: &NoOpPolicy,
) -> bool {
    let node = match change {
        Some(DiagramChange::AddNode(node)) => node,
        _ => return false,
    };

    let norm = normalize_label(node.display_label());
    if norm.is_empty() {
        return false;
    }

    let same_type = |l: &str| {
        l == norm || (norm.len() >= 3 && (l.contains(&norm) || norm.contains(l)))
    };
    let same_type_count = nodes
        .iter()
        .map(|n| normalize_label(n.display_label()))
        .filter(|l| same_type(l))
        .count();

    same_type_count >= policy.min_existing
        && policy
            .duplicate_prone
            .iter()
            .any(|d| norm.contains(d.as_str()) || d.contains(&norm))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(label: &str) -> DiagramNode {
        DiagramNode::new(label.to_lowercase().replace(' ', "-"), label)
    }

    fn add(label: &str) -> DiagramChange {
        DiagramChange::AddNode(node(label))
    }

    #[test]
    fn test_normalize_folds_synonyms() {
        assert_eq!(normalize_label("Load Balancer"), "lb");
        assert_eq!(normalize_label("Message Queue"), "queue");
        assert_eq!(normalize_label("Object Storage"), "storage");
        assert_eq!(normalize_label("  Rate  Limiter "), "rate-limiter");
    }

    #[test]
    fn test_topic_from_label() {
        assert_eq!(Topic::from_label("Redis Cache"), Topic::Cache);
        assert_eq!(Topic::from_label("Load Balancer"), Topic::Lb);
        assert_eq!(Topic::from_label("Message Queue"), Topic::Queue);
        assert_eq!(Topic::from_label("User Shard"), Topic::Shard);
        assert_eq!(Topic::from_label("Primary Database"), Topic::Database);
        assert_eq!(Topic::from_label("S3 Bucket"), Topic::Storage);
        assert_eq!(Topic::from_label("CDN"), Topic::Cdn);
        assert_eq!(Topic::from_label("Search Service"), Topic::Default);
    }

    #[test]
    fn test_topics_for_change_variants() {
        assert_eq!(
            topics_for_change(Some(&add("Cache")))[1],
            "ttl"
        );
        let connect = DiagramChange::Connect {
            source: "a".into(),
            target: "b".into(),
        };
        assert_eq!(topics_for_change(Some(&connect))[0], "consistency");
        let delete = DiagramChange::DeleteNode { id: "x".into() };
        assert_eq!(topics_for_change(Some(&delete))[0], "failure-modes");
        assert_eq!(topics_for_change(None)[0], "tradeoffs");
    }

    #[test]
    fn test_action_summary() {
        assert_eq!(action_summary(Some(&add("Cache"))), "Added Cache");
        let connect = DiagramChange::Connect {
            source: "app".into(),
            target: "db".into(),
        };
        assert_eq!(action_summary(Some(&connect)), "Connected app -> db");
        assert_eq!(action_summary(None), "Diagram change");
    }

    #[test]
    fn test_second_instance_is_allowed_third_is_flagged() {
        let policy = NoOpPolicy::default();
        let existing_one = vec![node("Client")];
        assert!(!is_no_op(Some(&add("Client")), &existing_one, &policy));

        let existing_two = vec![node("Client"), node("Client")];
        assert!(is_no_op(Some(&add("Client")), &existing_two, &policy));
    }

    #[test]
    fn test_non_duplicate_prone_types_never_flag() {
        let policy = NoOpPolicy::default();
        let existing = vec![node("Search Service"), node("Search Service")];
        assert!(!is_no_op(Some(&add("Search Service")), &existing, &policy));
    }

    #[test]
    fn test_threshold_is_configurable() {
        let strict = NoOpPolicy {
            min_existing: 1,
            ..Default::default()
        };
        let existing = vec![node("Cache")];
        assert!(is_no_op(Some(&add("Cache")), &existing, &strict));
    }

    #[test]
    fn test_only_add_node_can_be_no_op() {
        let policy = NoOpPolicy::default();
        let connect = DiagramChange::Connect {
            source: "a".into(),
            target: "b".into(),
        };
        assert!(!is_no_op(Some(&connect), &[], &policy));
        assert!(!is_no_op(None, &[], &policy));
    }
}
