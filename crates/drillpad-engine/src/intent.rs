/// What the user's last utterance was, refined into the response mode the
/// orchestrator uses. This is a priority-ordered rule list, not a learned
/// classifier; rule order is load-bearing and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserIntent {
    /// Chatter unrelated to the design.
    Offtopic,
    /// Confusion or an explicit help request.
    Coach,
    /// A bare acknowledgement that warrants a concrete scenario question.
    Clarify,
    /// A substantial answer worth scoring.
    Evaluate,
    /// A minimal answer warranting a fresh drill-down question.
    Ask,
}

const OFFTOPIC_TRIGGERS: &[&str] = &[
    "weather",
    "lunch",
    "dinner",
    "joke",
    "tell me a joke",
    "unrelated",
    "off topic",
    "of topic",
    "wrong question",
    "different subject",
    "how are you",
    "what time",
    "weekend",
    "vacation",
    "movie",
];

const COACH_TRIGGERS: &[&str] = &[
    "i don't know",
    "i dont know",
    "don't know",
    "dont know",
    "not sure",
    "teach",
    "teach me",
    "help",
    "what do you mean",
    "confused",
    "can you explain",
    "idk",
    "explain",
    "no idea",
    "help me",
];

const CLARIFY_TRIGGERS: &[&str] = &["yes", "ok", "done", "sure", "yep"];

const START_SENTINELS: &[&str] = &["[ready to start]", "[starting interview]"];

const EVALUATE_WORD_THRESHOLD: usize = 15;
const CLARIFY_WORD_THRESHOLD: usize = 4;

/// True for the sentinel messages the UI sends before the interview begins.
pub fn is_start_sentinel(text: &str) -> bool {
    let t = text.trim().to_lowercase();
    START_SENTINELS.contains(&t.as_str())
}

/// Classify the user's last utterance. `None` means there is nothing to
/// classify (empty text or a start sentinel) and the orchestrator treats the
/// turn as a session start. Rules are checked in order; first match wins.
pub fn classify_intent(message: &str) -> Option<UserIntent> {
    let t = message.trim().to_lowercase();
    if t.is_empty() || START_SENTINELS.contains(&t.as_str()) {
        return None;
    }

    if OFFTOPIC_TRIGGERS.iter().any(|p| t.contains(p)) {
        return Some(UserIntent::Offtopic);
    }

    if COACH_TRIGGERS.iter().any(|p| t.contains(p)) {
        return Some(UserIntent::Coach);
    }

    let words = t.split_whitespace().count();
    if words <= CLARIFY_WORD_THRESHOLD {
        let ack = CLARIFY_TRIGGERS.iter().any(|c| {
            t == *c || t.starts_with(&format!("{c} ")) || t == format!("{c}.")
        });
        if ack {
            return Some(UserIntent::Clarify);
        }
    }

    if words > EVALUATE_WORD_THRESHOLD {
        return Some(UserIntent::Evaluate);
    }

    Some(UserIntent::Ask)
}
