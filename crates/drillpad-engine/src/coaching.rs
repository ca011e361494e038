//! Coach, clarify, and evaluate responses: what the interviewer says when the
//! user is stuck, terse, or has just given a substantial answer.

use lazy_static::lazy_static;
use regex::Regex;

use crate::composer::format_rps;

lazy_static! {
    static ref HAS_NUMBERS: Regex = Regex::new(r"\d+").unwrap();
    static ref HAS_TRADEOFF: Regex = Regex::new(r"(?i)vs|tradeoff|consistency|latency|cost").unwrap();
    static ref HAS_FAILURE: Regex = Regex::new(r"(?i)fail|down|crash|stampede|dlq|retry").unwrap();
}

/// Which concept the coaching targets, inferred from the question the user is
/// stuck on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CoachTopic {
    Cache,
    Queue,
    Shard,
    Component,
}

impl CoachTopic {
    fn from_question(last_interviewer: &str) -> Self {
        let first_sentence = last_interviewer.split('.').next().unwrap_or("").to_lowercase();
        if first_sentence.contains("cache") {
            CoachTopic::Cache
        } else if first_sentence.contains("queue") {
            CoachTopic::Queue
        } else if first_sentence.contains("shard") {
            CoachTopic::Shard
        } else {
            CoachTopic::Component
        }
    }

    /// Follow-up pool. Repeated help requests rotate through it.
    fn follow_ups(&self) -> &'static [&'static str] {
        match self {
            CoachTopic::Cache => &[
                "If hit rate dropped from 90% to 70%, how much would DB QPS increase?",
                "What TTL would you use for user profiles vs trending content?",
                "How would you invalidate cache when data changes?",
                "What happens if Redis goes down—do you have a fallback?",
            ],
            CoachTopic::Queue => &[
                "If a message fails 5 times, where does it go and how do you handle it?",
                "At-least-once or exactly-once—which and why?",
                "How do you make duplicate processing safe?",
                "What metric would you alert on for consumer lag?",
            ],
            CoachTopic::Shard => &[
                "If one shard gets 3x the load of others, what would you do?",
                "How do you choose a partition key?",
                "What happens when you add a new shard—rebalancing?",
                "How would you handle a cross-shard query?",
            ],
            CoachTopic::Component => &[
                "What metric would you alert on first?",
                "What is your target p99 latency in ms?",
                "What tradeoff are you explicitly accepting?",
                "Describe one failure mode for this component.",
            ],
        }
    }
}

/// Build the coaching message: concept line, three thinking bullets, a worked
/// numeric example at the current traffic, and a follow-up picked by the
/// rotating index so repeated help requests surface different content.
pub fn coach_response(last_interviewer: &str, traffic: u64, follow_up_index: u32) -> String {
    let topic = CoachTopic::from_question(last_interviewer);
    let rps = format_rps(traffic);

    let (line, bullets, example): (&str, [&str; 3], String) = match topic {
        CoachTopic::Cache => (
            "A cache sits between your app and DB to avoid hitting the database for repeated reads.",
            [
                "Think: what happens on cache miss vs hit?",
                "Consider: TTL (how stale is OK?) and invalidation on write",
                "Failure: if cache dies, all traffic hits DB—what's the impact?",
            ],
            format!(
                "At {rps} RPS with 9:1 read ratio: 90% hit rate means 0.1 × {rps} = DB load. \
                 If cache fails, DB sees full {rps} RPS."
            ),
        ),
        CoachTopic::Queue => (
            "A message queue decouples producer and consumer; messages are buffered until consumed.",
            [
                "Think: at-least-once vs exactly-once—duplicates or drops?",
                "Consider: retries, DLQ for poison messages, backpressure",
                "Failure: consumer lag—queue grows; how do you alert?",
            ],
            format!(
                "At {rps} RPS: if consumer processes 500/sec, lag grows by 500/sec. \
                 Need to scale consumers or backpressure."
            ),
        ),
        CoachTopic::Shard => (
            "Sharding splits data by partition key so each shard holds a subset; enables horizontal scale.",
            [
                "Think: partition key choice—avoid hot shards",
                "Consider: rebalancing when adding shards, cross-shard queries",
                "Failure: one shard down—that partition unavailable",
            ],
            format!(
                "At {rps} RPS across 4 shards: ~{}/shard. Hot user could overload one shard.",
                traffic / 4
            ),
        ),
        CoachTopic::Component => (
            "Each component has tradeoffs: latency vs consistency, cost vs performance.",
            [
                "State your choice clearly",
                "Give one number (QPS, TTL, p99)",
                "Describe one failure mode",
            ],
            format!("At {rps} RPS, state expected p99 latency and one thing that could break."),
        ),
    };

    let follow_ups = topic.follow_ups();
    let follow_up = follow_ups[(follow_up_index as usize) % follow_ups.len()];

    let mut parts = vec![line.to_string()];
    for b in bullets {
        parts.push(format!("• {b}"));
    }
    parts.push(format!("Worked example: {example}"));
    parts.push(format!("Try this: {follow_up}"));
    parts.join(" ")
}

/// Short concrete scenario question after a bare acknowledgement.
pub fn clarify_response(last_interviewer: &str) -> String {
    let last = last_interviewer.to_lowercase();
    if last.contains("cache") {
        "Assume cache hit rate is 90%. If a cache node fails and hit rate drops to 70%, \
         what happens to DB QPS? (Rough number is fine.)"
            .to_string()
    } else if last.contains("queue") {
        "Assume at-least-once delivery. One message is processed twice. How do you make that safe?"
            .to_string()
    } else if last.contains("shard") {
        "You have 4 shards. One user generates 40% of traffic. Which shard is hot and what's the impact?"
            .to_string()
    } else {
        "Pick one: what's your target p99 latency in ms, or your expected QPS per component?"
            .to_string()
    }
}

/// Score a substantial answer: report up to two strengths and two gaps, then
/// ask one sharper follow-up chosen by the largest gap
/// (numbers > failure-mode > tradeoff).
pub fn evaluate_response(answer: &str) -> String {
    let has_numbers = HAS_NUMBERS.is_match(answer);
    let has_tradeoff = HAS_TRADEOFF.is_match(answer);
    let has_failure = HAS_FAILURE.is_match(answer);

    let mut strong = Vec::new();
    let mut missing = Vec::new();
    if has_numbers {
        strong.push("You included numbers");
    } else {
        missing.push("Concrete numbers (QPS, TTL, p99)");
    }
    if has_tradeoff {
        strong.push("You mentioned a tradeoff");
    } else {
        missing.push("Explicit tradeoff (e.g. latency vs consistency)");
    }
    if has_failure {
        strong.push("You addressed a failure mode");
    } else {
        missing.push("Failure mode or containment");
    }
    if strong.is_empty() {
        strong.push("You engaged with the question");
    }
    if missing.is_empty() {
        missing.push("Operational detail (metrics, alerting)");
    }

    let sharper = if !has_numbers {
        "What's the ballpark QPS and p99 for this path?"
    } else if !has_failure {
        "What happens when this component fails—and how do you detect it?"
    } else {
        "What tradeoff are you explicitly accepting (cost, latency, consistency)?"
    };

    format!(
        "Good. Here's what's strong / missing: Strong: {}. Missing: {}. {}",
        strong[..strong.len().min(2)].join("; "),
        missing[..missing.len().min(2)].join("; "),
        sharper
    )
}

/// Factually wrong statements get challenged immediately, before any other
/// handling, and leave memory untouched.
pub fn detect_wrong(text: &str) -> Option<&'static str> {
    let t = text.to_lowercase();
    if t.contains("lb controls client") || t.contains("load balancer controls") {
        return Some("LB routes requests; it doesn't control clients.");
    }
    if t.contains("cache is always consistent") {
        return Some("Caches introduce consistency challenges. What invalidation strategy?");
    }
    if t.contains("mq guarantees order") || t.contains("queue guarantees order") {
        return Some(
            "Message queues often don't guarantee global ordering. How are you handling partitions?",
        );
    }
    None
}
