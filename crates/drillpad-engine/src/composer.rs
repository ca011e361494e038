use lazy_static::lazy_static;
use regex::Regex;

use drillpad_corpus::RetrievedChunk;

use crate::topics::Topic;
use crate::turn::{DiagramEdge, DiagramNode};

lazy_static! {
    static ref CACHE_LABEL: Regex = Regex::new(r"cache|redis|memcache").unwrap();
    static ref QUEUE_LABEL: Regex = Regex::new(r"queue|kafka|sqs|rabbit|mq").unwrap();
    static ref SHARD_LABEL: Regex = Regex::new(r"shard|partition").unwrap();
    static ref REPLICA_LABEL: Regex = Regex::new(r"replica|replication|secondary|slave").unwrap();
    // If the main line already asks for one of these, no numeric ask is appended.
    static ref QUANTITATIVE_TERM: Regex = Regex::new(
        r"(?i)quantify|qps|p99|latency|numbers?|ttl|retry|rto|rpo|replication lag|failover time"
    )
    .unwrap();
}

/// Thresholds driving how quantitative and adversarial questions become.
const NUMBERS_TRAFFIC_THRESHOLD: u64 = 100_000;
const PRESSURE_TRAFFIC_THRESHOLD: u64 = 200_000;
const NUMBERS_DIFFICULTY_THRESHOLD: u8 = 3;
const FOLLOW_UP_DIFFICULTY_THRESHOLD: u8 = 3;

const PRESSURE_PREFIX: &str = "Imagine traffic spikes 3x during a launch. ";

/// Escalation ladder for the generic fallback question, keyed by difficulty.
const ESCALATION: [&str; 5] = [
    "Explain your choice.",
    "What breaks first under load?",
    "What metric alerts you?",
    "What's your mitigation plan in under 5 minutes?",
    "What tradeoff are you explicitly accepting?",
];

const NUMERIC_ASKS: [&str; 6] = [
    "QPS per component",
    "p99 latency target",
    "TTL in seconds",
    "replication lag in ms",
    "retry count",
    "RTO/RPO in seconds",
];

/// Retrieval-query keywords per difficulty level 1..=5.
const DIFF_KEYWORDS: [&[&str]; 5] = [
    &["definition", "when to use"],
    &["when to use", "tradeoffs"],
    &["tradeoffs", "failure modes", "metrics"],
    &["numbers", "qps", "latency", "metrics", "operational"],
    &["concrete numbers", "correctness", "edge cases", "rpo", "rto"],
];

/// What the diagram currently looks like, reduced to what the composer needs.
#[derive(Debug, Clone, Default)]
pub struct DiagramContext {
    pub has_cache: bool,
    pub has_queue: bool,
    pub shard_count: usize,
    pub has_replica: bool,
    pub path_desc: String,
    pub labels: Vec<String>,
}

/// Canonical request-flow order used when no explicit edges resolve a path.
const CANONICAL_ORDER: [&str; 9] = [
    "client", "load balancer", "lb", "app", "cache", "queue", "database", "db", "shard",
];

/// Reduce nodes and edges to the component presence flags and path description
/// the templates embed. The just-added node (if any) is counted too.
pub fn extract_diagram_context(
    nodes: &[DiagramNode],
    edges: &[DiagramEdge],
    added: Option<&DiagramNode>,
) -> DiagramContext {
    let mut labels: Vec<String> = nodes
        .iter()
        .map(|n| n.display_label().trim().to_lowercase())
        .collect();
    if let Some(node) = added {
        labels.push(node.display_label().trim().to_lowercase());
    }

    let has_cache = labels.iter().any(|l| CACHE_LABEL.is_match(l));
    let has_queue = labels.iter().any(|l| QUEUE_LABEL.is_match(l));
    let shard_count = labels.iter().filter(|l| SHARD_LABEL.is_match(l)).count();
    let has_replica = labels.iter().any(|l| REPLICA_LABEL.is_match(l));

    let mut path_parts = Vec::new();
    for edge in edges {
        let src = nodes
            .iter()
            .find(|n| n.id == edge.source)
            .map(|n| n.display_label())
            .unwrap_or(edge.source.as_str())
            .trim();
        let tgt = nodes
            .iter()
            .find(|n| n.id == edge.target)
            .map(|n| n.display_label())
            .unwrap_or(edge.target.as_str())
            .trim();
        if !src.is_empty() && !tgt.is_empty() {
            path_parts.push(format!("{src} → {tgt}"));
        }
    }

    let path_desc = if !path_parts.is_empty() {
        path_parts.join(", ")
    } else {
        // Sort labels by where each component canonically sits in the flow.
        let rank = |l: &str| {
            CANONICAL_ORDER
                .iter()
                .position(|o| l.contains(o) || o.contains(l))
                .unwrap_or(99)
        };
        let mut sorted: Vec<&String> = labels.iter().filter(|l| l.len() > 1).collect();
        sorted.sort_by_key(|l| rank(l));
        if sorted.is_empty() {
            "app → db".to_string()
        } else {
            sorted
                .iter()
                .map(|l| l.as_str())
                .collect::<Vec<_>>()
                .join(" → ")
        }
    };

    DiagramContext {
        has_cache,
        has_queue,
        shard_count,
        has_replica,
        path_desc,
        labels,
    }
}

/// Build the retrieval query from the action summary, the tail of the user's
/// answer, and the difficulty/topic keywords.
pub fn build_retrieval_query(
    action_summary: &str,
    user_answer: &str,
    difficulty: u8,
    topics: &[&str],
) -> String {
    let diff = difficulty.clamp(1, 5);
    let diff_kws = DIFF_KEYWORDS[(diff - 1) as usize];

    let mut parts = Vec::new();
    if !action_summary.is_empty() {
        parts.push(action_summary.to_string());
    }
    if !user_answer.is_empty() {
        let head: String = user_answer.chars().take(80).collect();
        parts.push(format!("user: {head}"));
    }
    let focus: Vec<&str> = topics.iter().chain(diff_kws.iter()).copied().collect();
    parts.push(format!("focus: {}", focus.join(", ")));
    parts.join("; ")
}

/// Traffic figure formatted the way the questions embed it: "12K" for 12,000.
pub fn format_rps(traffic: u64) -> String {
    if traffic >= 1000 {
        let thousands = (traffic as f64 / 1000.0).round() as u64;
        format!("{thousands}K")
    } else {
        traffic.to_string()
    }
}

/// The structured question returned to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedQuestion {
    pub main: String,
    pub why: String,
    pub looking_for: Vec<String>,
    pub follow_up: Option<String>,
}

impl ComposedQuestion {
    /// Render to the single display string shown to the user.
    pub fn render(&self) -> String {
        let mut parts = vec![self.main.clone()];
        if !self.why.is_empty() {
            parts.push(self.why.clone());
        }
        if !self.looking_for.is_empty() {
            parts.push(format!("I'm looking for: {}", self.looking_for.join(", ")));
        }
        if let Some(ref follow_up) = self.follow_up {
            parts.push(follow_up.clone());
        }
        parts.join(" ")
    }
}

/// Inputs to [`compose`]. Retrieved chunks steer the query upstream; the
/// heuristic templates themselves never quote them, which keeps composed text
/// bounded and deterministic.
pub struct ComposeInput<'a> {
    pub topic: Topic,
    pub chunks: &'a [RetrievedChunk],
    pub difficulty: u8,
    pub is_no_op: bool,
    pub user_answer: &'a str,
    pub context: &'a DiagramContext,
    pub traffic_load: u64,
    pub action_summary: &'a str,
}

/// Assemble a structured interview question from topic, diagram context,
/// difficulty, and traffic load.
pub fn compose(input: &ComposeInput<'_>) -> ComposedQuestion {
    let ctx = input.context;
    let traffic = input.traffic_load;
    let diff = if input.difficulty == 0 {
        3
    } else {
        input.difficulty.clamp(1, 5)
    };
    let needs_numbers =
        traffic > NUMBERS_TRAFFIC_THRESHOLD || diff >= NUMBERS_DIFFICULTY_THRESHOLD;
    let pressure = traffic > PRESSURE_TRAFFIC_THRESHOLD;
    let prefix = if pressure { PRESSURE_PREFIX } else { "" };

    if input.is_no_op {
        return ComposedQuestion {
            main: "This change may be unnecessary — what problem does it solve?".to_string(),
            why: "Every component should map to a requirement: latency, availability, \
                  scalability, cost, or simplicity."
                .to_string(),
            looking_for: vec![
                "which requirement it addresses".to_string(),
                "how it differs from existing components".to_string(),
                "concrete benefit with numbers if possible".to_string(),
            ],
            follow_up: None,
        };
    }

    let mut looking_for = vec![
        "concrete numbers".to_string(),
        "explicit tradeoff".to_string(),
        "failure containment strategy".to_string(),
        "operational awareness".to_string(),
    ];
    if needs_numbers {
        looking_for[0] = NUMERIC_ASKS[(diff as usize) % NUMERIC_ASKS.len()].to_string();
    }

    let rps = format_rps(traffic);
    let topic = input.topic;
    let drilling_default = topic == Topic::Default;

    let (mut main, why) = if ctx.has_cache && (topic == Topic::Cache || drilling_default) {
        let mut main = format!(
            "{prefix}At {rps} RPS, your cache sits in front of {}DB. ",
            if ctx.shard_count > 0 { "sharded " } else { "" }
        );
        if ctx.shard_count > 0 {
            main.push_str(
                "If one cache node fails, what happens to your primary shard? \
                 Quantify the impact on DB QPS and p99 latency.",
            );
        } else {
            main.push_str("If one cache node fails, what happens? Give me DB QPS impact and p99.");
        }
        (main, "Cache failures can cascade to the database.")
    } else if ctx.has_queue && (topic == Topic::Queue || drilling_default) {
        let mut main = format!("{prefix}You have a message queue in the path. ");
        if diff >= 3 {
            main.push_str(
                "How do you handle idempotency and duplicate processing? What about \
                 poison messages — how do you detect and contain them?",
            );
        } else {
            main.push_str("At-least-once or exactly-once? How do you handle duplicates?");
        }
        (main, "Delivery semantics affect correctness.")
    } else if ctx.shard_count > 0 && (topic == Topic::Shard || drilling_default) {
        let plural = if ctx.shard_count > 1 { "s" } else { "" };
        let main = format!(
            "{prefix}At {rps} RPS with {} shard{plural}, describe a hot-partition scenario. \
             How would you rebalance? What about cross-shard transactions?",
            ctx.shard_count
        );
        (main, "Hot partitions limit scalability.")
    } else if ctx.has_replica && (topic == Topic::Database || drilling_default) {
        let main = format!(
            "{prefix}With replicas in the path, what's your replication lag? \
             When do you get stale reads? What's your failover time?"
        );
        (main, "Replication lag affects consistency.")
    } else if topic == Topic::Lb {
        let main =
            format!("{prefix}At {rps} RPS, L4 or L7? What routing strategy and health check interval?");
        (main, "Affects failover and load distribution.")
    } else {
        let main = format!(
            "{prefix}Path: {}. {}",
            ctx.path_desc,
            ESCALATION[(diff - 1) as usize]
        );
        (main, "Shows operational depth.")
    };

    if needs_numbers && !QUANTITATIVE_TERM.is_match(&main) {
        main.push_str(" Give me at least one number: QPS, p99, TTL, or RTO.");
    }

    let follow_up = if diff >= FOLLOW_UP_DIFFICULTY_THRESHOLD {
        Some("If you choose that approach, what about edge cases at 2x traffic?".to_string())
    } else {
        None
    };

    ComposedQuestion {
        main,
        why: why.to_string(),
        looking_for,
        follow_up,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, label: &str) -> DiagramNode {
        DiagramNode::new(id, label)
    }

    fn edge(source: &str, target: &str) -> DiagramEdge {
        DiagramEdge {
            source: source.to_string(),
            target: target.to_string(),
        }
    }

    fn base_ctx() -> DiagramContext {
        extract_diagram_context(&[], &[], None)
    }

    fn compose_with(topic: Topic, ctx: &DiagramContext, difficulty: u8, traffic: u64) -> ComposedQuestion {
        compose(&ComposeInput {
            topic,
            chunks: &[],
            difficulty,
            is_no_op: false,
            user_answer: "",
            context: ctx,
            traffic_load: traffic,
            action_summary: "Added Cache",
        })
    }

    #[test]
    fn test_context_flags_and_shard_count() {
        let nodes = vec![
            node("c", "Client"),
            node("r", "Redis Cache"),
            node("s1", "User Shard 1"),
            node("s2", "User Shard 2"),
            node("rep", "Read Replica"),
        ];
        let ctx = extract_diagram_context(&nodes, &[], None);
        assert!(ctx.has_cache);
        assert!(!ctx.has_queue);
        assert_eq!(ctx.shard_count, 2);
        assert!(ctx.has_replica);
    }

    #[test]
    fn test_path_desc_from_edges() {
        let nodes = vec![node("a", "App"), node("d", "Database")];
        let edges = vec![edge("a", "d")];
        let ctx = extract_diagram_context(&nodes, &edges, None);
        assert_eq!(ctx.path_desc, "App → Database");
    }

    #[test]
    fn test_path_desc_canonical_order_without_edges() {
        let nodes = vec![
            node("d", "database"),
            node("c", "client"),
            node("ca", "cache"),
        ];
        let ctx = extract_diagram_context(&nodes, &[], None);
        assert_eq!(ctx.path_desc, "client → cache → database");
    }

    #[test]
    fn test_path_desc_empty_diagram_falls_back() {
        let ctx = extract_diagram_context(&[], &[], None);
        assert_eq!(ctx.path_desc, "app → db");
    }

    #[test]
    fn test_format_rps() {
        assert_eq!(format_rps(500), "500");
        assert_eq!(format_rps(1000), "1K");
        assert_eq!(format_rps(12_000), "12K");
        assert_eq!(format_rps(250_000), "250K");
    }

    #[test]
    fn test_no_op_short_circuits() {
        let ctx = base_ctx();
        let q = compose(&ComposeInput {
            topic: Topic::Cache,
            chunks: &[],
            difficulty: 5,
            is_no_op: true,
            user_answer: "",
            context: &ctx,
            traffic_load: 500_000,
            action_summary: "Added Cache",
        });
        assert!(q.main.contains("unnecessary"));
        assert!(q.follow_up.is_none());
        // The flag ignores difficulty and traffic entirely.
        assert!(!q.main.starts_with(PRESSURE_PREFIX));
    }

    #[test]
    fn test_cache_template_embeds_traffic() {
        let nodes = vec![node("r", "Redis Cache")];
        let ctx = extract_diagram_context(&nodes, &[], None);
        let q = compose_with(Topic::Cache, &ctx, 2, 12_000);
        assert!(q.main.contains("12K RPS"));
        assert!(q.main.contains("cache"));
    }

    #[test]
    fn test_pressure_prefix_above_200k() {
        let nodes = vec![node("r", "Redis Cache")];
        let ctx = extract_diagram_context(&nodes, &[], None);
        let q = compose_with(Topic::Cache, &ctx, 2, 250_000);
        assert!(q.main.starts_with(PRESSURE_PREFIX));

        let calm = compose_with(Topic::Cache, &ctx, 2, 200_000);
        assert!(!calm.main.starts_with(PRESSURE_PREFIX));
    }

    #[test]
    fn test_numeric_rubric_swap_at_difficulty_three() {
        let ctx = base_ctx();
        let easy = compose_with(Topic::Default, &ctx, 2, 1000);
        assert_eq!(easy.looking_for[0], "concrete numbers");

        let hard = compose_with(Topic::Default, &ctx, 3, 1000);
        assert_eq!(hard.looking_for[0], NUMERIC_ASKS[3]);
        assert_eq!(hard.looking_for.len(), 4);
    }

    #[test]
    fn test_numeric_ask_appended_when_main_lacks_numbers() {
        let ctx = base_ctx();
        // Difficulty 1 escalation line has no quantitative term, and high
        // traffic forces needs_numbers.
        let q = compose_with(Topic::Default, &ctx, 1, 150_000);
        assert!(q.main.contains("Give me at least one number"));
    }

    #[test]
    fn test_follow_up_only_at_difficulty_three_plus() {
        let ctx = base_ctx();
        assert!(compose_with(Topic::Default, &ctx, 2, 1000).follow_up.is_none());
        assert!(compose_with(Topic::Default, &ctx, 3, 1000).follow_up.is_some());
    }

    #[test]
    fn test_escalation_ladder_varies_by_difficulty() {
        let ctx = base_ctx();
        let q1 = compose_with(Topic::Default, &ctx, 1, 1000);
        let q5 = compose_with(Topic::Default, &ctx, 5, 1000);
        assert!(q1.main.contains("Explain your choice."));
        assert!(q5.main.contains("What tradeoff are you explicitly accepting?"));
    }

    #[test]
    fn test_render_concatenates_parts() {
        let q = ComposedQuestion {
            main: "Main?".to_string(),
            why: "Why.".to_string(),
            looking_for: vec!["a".to_string(), "b".to_string()],
            follow_up: Some("Follow?".to_string()),
        };
        assert_eq!(q.render(), "Main? Why. I'm looking for: a, b Follow?");
    }

    #[test]
    fn test_build_retrieval_query_shape() {
        let q = build_retrieval_query("Added Cache", "use redis", 4, &["caching", "ttl"]);
        assert!(q.starts_with("Added Cache; user: use redis; focus: caching, ttl,"));
        assert!(q.contains("qps"));
    }
}
