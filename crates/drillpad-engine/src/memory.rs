use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Recent-topic window.
pub const MAX_TOPICS: usize = 5;
/// Full asked-topic history cap.
const MAX_ASKED_TOPICS: usize = 20;
/// Window for fuzzy anti-repeat against recently asked questions.
pub const LAST_ASKED_COUNT: usize = 3;

const DIFFICULTY_MIN: u8 = 1;
const DIFFICULTY_MAX: u8 = 5;

lazy_static! {
    // A number with a unit is the clearest signal of a quantitative answer.
    static ref NUMBER_UNIT: Regex =
        Regex::new(r"(?i)\d+\s*(ms|qps|%|ttl|replicas?|rpo|rto|seconds?|mb|gb)").unwrap();
    static ref TRADEOFF_LANGUAGE: Regex =
        Regex::new(r"(?i)latency\s*vs|consistency\s*vs|cost\s*vs|tradeoff|trade-off").unwrap();
    static ref WEAK_ANSWER: Regex =
        Regex::new(r"(?i)\b(idk|dont know|don't know|not sure)\b").unwrap();
}

/// The interview sections, in the fixed order they are opened.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Requirements,
    Hld,
    ApisData,
    Scaling,
    Consistency,
    Failure,
    Security,
    WrapUp,
}

impl Section {
    pub const ALL: [Section; 8] = [
        Section::Requirements,
        Section::Hld,
        Section::ApisData,
        Section::Scaling,
        Section::Consistency,
        Section::Failure,
        Section::Security,
        Section::WrapUp,
    ];

    /// The fixed line that opens this section.
    pub fn opener(&self) -> &'static str {
        match self {
            Section::Requirements => {
                "Let's scope this. What are the core use cases and non-negotiables?"
            }
            Section::Hld => "Walk me through the high-level architecture and data flow.",
            Section::ApisData => "Define the main APIs and data model.",
            Section::Scaling => "Given your traffic numbers, run the scaling math.",
            Section::Consistency => "What consistency guarantees do you need?",
            Section::Failure => {
                "What are the failure modes? How do you detect, mitigate, and recover?"
            }
            Section::Security => "Security and privacy—auth, encryption, PII handling?",
            Section::WrapUp => {
                "Summarize the strengths and risks. One improvement with more time?"
            }
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Section::Requirements => "requirements",
            Section::Hld => "hld",
            Section::ApisData => "apis_data",
            Section::Scaling => "scaling",
            Section::Consistency => "consistency",
            Section::Failure => "failure",
            Section::Security => "security",
            Section::WrapUp => "wrap_up",
        }
    }
}

/// Everything the engine remembers between turns for one session.
///
/// Exchanged with the caller as a flat serializable record; the engine never
/// performs its own I/O. Hashes and topics are append-only within a turn and
/// counters only advance; nothing resets short of a full session reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionMemory {
    /// Normalized first-sentence hash of every question ever asked. Never shrinks.
    pub asked_question_hashes: Vec<String>,
    /// All drilled topics, capped at the last 20.
    pub asked_topics: Vec<String>,
    /// Recently covered topics, capped at the last 5.
    pub topic_history: Vec<String>,
    /// 1..=5, derived from skill.
    pub difficulty: u8,
    pub skill: u32,
    /// First sentences of the last 3 asked questions, for fuzzy anti-repeat.
    pub last_asked_questions: Vec<String>,
    pub no_op_justify_attempts: u32,
    /// Rotates which coach follow-up surfaces on repeated help requests.
    pub coach_follow_up_index: u32,
    pub covered_sections: BTreeMap<Section, bool>,
    /// First 200 chars of the user's last answer, as retrieval seed.
    pub last_user_answer: String,
    pub last_action_summary: String,
    pub last_question_hash: String,
    pub mode: String,
}

impl Default for SessionMemory {
    fn default() -> Self {
        Self {
            asked_question_hashes: Vec::new(),
            asked_topics: Vec::new(),
            topic_history: Vec::new(),
            difficulty: DIFFICULTY_MIN,
            skill: 0,
            last_asked_questions: Vec::new(),
            no_op_justify_attempts: 0,
            coach_follow_up_index: 0,
            covered_sections: BTreeMap::new(),
            last_user_answer: String::new(),
            last_action_summary: String::new(),
            last_question_hash: String::new(),
            mode: "ASK".to_string(),
        }
    }
}

impl SessionMemory {
    /// Adjust skill from the user's answer and recompute difficulty.
    /// Numbers with units and explicit tradeoff language raise skill; short or
    /// "don't know" answers lower it. Answers under 5 chars are ignored.
    pub fn update_skill(&mut self, answer: &str) {
        let t = answer.trim();
        if t.len() < 5 {
            return;
        }

        let mut delta: i32 = 0;
        if NUMBER_UNIT.is_match(t) {
            delta += 1;
        }
        if TRADEOFF_LANGUAGE.is_match(t) {
            delta += 1;
        }
        if t.len() < 20 || WEAK_ANSWER.is_match(t) {
            delta -= 1;
        }

        self.skill = if delta >= 0 {
            self.skill.saturating_add(delta as u32)
        } else {
            self.skill.saturating_sub(delta.unsigned_abs())
        };
        // Clamp in u32 before narrowing so a long session can't wrap the cast.
        self.difficulty =
            (1 + self.skill / 2).clamp(DIFFICULTY_MIN as u32, DIFFICULTY_MAX as u32) as u8;
    }

    /// Record an accepted question: hash (deduped), topic windows, last hash.
    pub fn record_question(&mut self, main: &str, topic: &str) {
        let h = question_hash(main);
        if !self.asked_question_hashes.contains(&h) {
            self.asked_question_hashes.push(h.clone());
        }
        if !topic.is_empty() {
            self.asked_topics.push(topic.to_string());
            trim_front(&mut self.asked_topics, MAX_ASKED_TOPICS);
            self.topic_history.push(topic.to_string());
            trim_front(&mut self.topic_history, MAX_TOPICS);
        }
        self.last_question_hash = h;
    }

    pub fn was_asked(&self, main: &str) -> bool {
        self.asked_question_hashes.contains(&question_hash(main))
    }

    /// Remember a just-asked first sentence, keeping the last 3.
    pub fn push_last_asked(&mut self, first_sentence: &str) {
        if first_sentence.is_empty() {
            return;
        }
        self.last_asked_questions.push(first_sentence.to_string());
        trim_front(&mut self.last_asked_questions, LAST_ASKED_COUNT);
    }

    pub fn note_topic(&mut self, topic: &str) {
        self.topic_history.push(topic.to_string());
        trim_front(&mut self.topic_history, MAX_TOPICS);
    }

    pub fn is_covered(&self, section: Section) -> bool {
        self.covered_sections.get(&section).copied().unwrap_or(false)
    }

    pub fn mark_covered(&mut self, section: Section) {
        self.covered_sections.insert(section, true);
    }

    /// First section not yet opened, in fixed order. Wrap-up when exhausted.
    pub fn next_uncovered_section(&self) -> Section {
        Section::ALL
            .iter()
            .copied()
            .find(|s| !self.is_covered(*s))
            .unwrap_or(Section::WrapUp)
    }
}

/// Normalized first-sentence hash of a question: first line, trimmed, first
/// 100 chars, lowercased, whitespace collapsed.
pub fn question_hash(text: &str) -> String {
    let main: String = text
        .lines()
        .next()
        .unwrap_or("")
        .trim()
        .chars()
        .take(100)
        .collect();
    main.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

fn trim_front(items: &mut Vec<String>, cap: usize) {
    if items.len() > cap {
        let excess = items.len() - cap;
        items.drain(..excess);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skill_rises_on_numbers_and_tradeoffs() {
        let mut mem = SessionMemory::default();
        mem.update_skill("Write-through with 300 seconds TTL; latency vs consistency tradeoff.");
        assert_eq!(mem.skill, 2);
        assert_eq!(mem.difficulty, 2);
    }

    #[test]
    fn test_skill_drops_on_weak_answers_but_never_below_zero() {
        let mut mem = SessionMemory::default();
        mem.update_skill("idk maybe");
        assert_eq!(mem.skill, 0);
        assert_eq!(mem.difficulty, 1);

        mem.skill = 3;
        mem.update_skill("not sure about any of that to be honest");
        assert_eq!(mem.skill, 2);
    }

    #[test]
    fn test_tiny_answers_are_ignored() {
        let mut mem = SessionMemory::default();
        mem.skill = 4;
        mem.update_skill("ok");
        assert_eq!(mem.skill, 4);
    }

    #[test]
    fn test_difficulty_is_step_function_of_skill() {
        let mut mem = SessionMemory::default();
        let mut last = mem.difficulty;
        for _ in 0..12 {
            mem.update_skill("p99 under 200 ms with a latency vs consistency tradeoff");
            assert!(mem.difficulty >= last);
            last = mem.difficulty;
        }
        assert_eq!(mem.difficulty, 5);
    }

    #[test]
    fn test_difficulty_stays_capped_at_high_skill() {
        let mut mem = SessionMemory::default();
        mem.skill = 510;
        mem.update_skill("p99 under 200 ms with a latency vs consistency tradeoff");
        assert_eq!(mem.skill, 512);
        assert_eq!(mem.difficulty, 5);
    }

    #[test]
    fn test_question_hash_normalizes() {
        let h1 = question_hash("What   breaks first\nunder load?");
        let h2 = question_hash("what breaks first");
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_record_question_dedupes_hashes() {
        let mut mem = SessionMemory::default();
        mem.record_question("At 12K RPS, what breaks?", "cache");
        mem.record_question("At 12K RPS, what breaks?", "cache");
        assert_eq!(mem.asked_question_hashes.len(), 1);
        assert_eq!(mem.topic_history, vec!["cache", "cache"]);
    }

    #[test]
    fn test_topic_history_caps_at_five() {
        let mut mem = SessionMemory::default();
        for t in ["a", "b", "c", "d", "e", "f", "g"] {
            mem.note_topic(t);
        }
        assert_eq!(mem.topic_history, vec!["c", "d", "e", "f", "g"]);
    }

    #[test]
    fn test_section_advance_order() {
        let mut mem = SessionMemory::default();
        assert_eq!(mem.next_uncovered_section(), Section::Requirements);
        mem.mark_covered(Section::Requirements);
        assert_eq!(mem.next_uncovered_section(), Section::Hld);
        for s in Section::ALL {
            mem.mark_covered(s);
        }
        assert_eq!(mem.next_uncovered_section(), Section::WrapUp);
    }

    #[test]
    fn test_memory_round_trips_through_json() {
        let mut mem = SessionMemory::default();
        mem.record_question("How do you shard?", "shard");
        mem.mark_covered(Section::Requirements);
        mem.update_skill("10K qps read path, latency vs consistency");

        let json = serde_json::to_string(&mem).unwrap();
        let back: SessionMemory = serde_json::from_str(&json).unwrap();
        assert_eq!(mem, back);
    }
}
