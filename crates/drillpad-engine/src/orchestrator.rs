use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use drillpad_corpus::CorpusIndex;

use crate::coaching::{clarify_response, coach_response, detect_wrong, evaluate_response};
use crate::composer::{
    build_retrieval_query, compose, extract_diagram_context, ComposeInput, ComposedQuestion,
};
use crate::config::{EngineConfig, ANGLES};
use crate::intent::{classify_intent, is_start_sentinel, UserIntent};
use crate::memory::{Section, SessionMemory};
use crate::topics::{action_summary, is_no_op, topics_for_change, Topic};
use crate::turn::{
    DiagramChange, Evaluation, ResponseIntent, Target, TurnInput, TurnOutput,
};

lazy_static! {
    static ref SUBSTANTIVE_ANSWER: Regex =
        Regex::new(r"(?i)\d|qps|ttl|partition|cache|replica|consistency|availability").unwrap();
}

/// Topics that mean the conversation is currently drilling into a component
/// rather than moving across interview sections.
const COMPONENT_TOPICS: [&str; 7] = [
    "cache", "queue", "shard", "lb", "database", "sharding", "caching",
];

const OFFTOPIC_REDIRECT: &str =
    "Let's stay focused on the system design. What component did you add or change, and why?";
const MOVE_CHALLENGE: &str = "That change doesn't alter the design—why did you do it?";
const NO_OP_REMOVAL_CHALLENGE: &str =
    "Consider removing it and adding a component that clearly addresses latency, availability, \
     or scalability. What would you add instead?";

/// Compute one interviewer response. Pure: consumes a memory snapshot and
/// returns the updated one; the response mode is derived entirely from
/// `(intent, change, memory)` each turn. Never fails and never returns an
/// empty message — malformed input degrades to a generic fallback question.
pub fn heuristic_turn(
    input: &TurnInput,
    mut mem: SessionMemory,
    corpus: &CorpusIndex,
    config: &EngineConfig,
) -> (TurnOutput, SessionMemory) {
    let nodes = &input.diagram_snapshot.nodes;
    let change = input.last_change_event.as_ref();
    let last_user_text = input.transcript.last_user_text().to_string();
    let last_interviewer = input.transcript.last_interviewer_text();

    // Factually wrong claims are challenged before anything else, with the
    // memory snapshot passed through untouched.
    if !last_user_text.is_empty() {
        if let Some(challenge) = detect_wrong(&last_user_text) {
            debug!("Challenging factually wrong statement");
            let output = TurnOutput::new(challenge, ResponseIntent::Challenge)
                .with_evaluation(Evaluation::quality(2).with_issue("Incorrect"));
            return (output, mem);
        }
    }

    mem.last_user_answer = last_user_text.chars().take(200).collect();
    mem.last_action_summary = action_summary(change);
    if !last_user_text.is_empty() && !is_start_sentinel(&last_user_text) {
        mem.update_skill(&last_user_text);
    }

    // Whether the *previous* turn already asked the user to justify a no-op.
    let previously_flagged_no_op = mem.no_op_justify_attempts >= 1;

    match classify_intent(&last_user_text) {
        Some(UserIntent::Offtopic) => {
            let output = TurnOutput::new(OFFTOPIC_REDIRECT, ResponseIntent::Clarify)
                .with_evaluation(Evaluation::quality(2).with_issue("Off-topic"));
            return (output, mem);
        }
        Some(UserIntent::Coach) => {
            let idx = mem.coach_follow_up_index;
            let msg = coach_response(last_interviewer, input.traffic_load, idx);
            mem.coach_follow_up_index = idx + 1;
            mem.mode = "COACH".to_string();
            let output = TurnOutput::new(msg, ResponseIntent::Clarify)
                .with_evaluation(Evaluation::quality(3));
            return (output, mem);
        }
        Some(UserIntent::Clarify) => {
            let msg = clarify_response(last_interviewer);
            let output = TurnOutput::new(msg, ResponseIntent::Clarify)
                .with_evaluation(Evaluation::quality(3));
            return (output, mem);
        }
        Some(UserIntent::Evaluate) => {
            let msg = evaluate_response(&last_user_text);
            let output = TurnOutput::new(msg, ResponseIntent::DrillDown)
                .with_evaluation(Evaluation::quality(4));
            return (output, mem);
        }
        // Ask and "nothing to classify" both continue into diagram handling.
        Some(UserIntent::Ask) | None => {}
    }

    // A move changes nothing about the design.
    if matches!(change, Some(DiagramChange::Move { .. })) {
        let output = TurnOutput::new(MOVE_CHALLENGE, ResponseIntent::Challenge)
            .with_evaluation(Evaluation::quality(2).with_issue("No meaningful change"));
        return (output, mem);
    }

    // Second consecutive no-op: stop drilling, push toward removal.
    if previously_flagged_no_op
        && !last_user_text.is_empty()
        && is_no_op(change, nodes, &config.no_op)
    {
        mem.no_op_justify_attempts = 1;
        let output = TurnOutput::new(NO_OP_REMOVAL_CHALLENGE, ResponseIntent::Challenge)
            .with_evaluation(Evaluation::quality(2).with_issue("Unnecessary component"));
        return (output, mem);
    }

    // Session start: open with the requirements section.
    if input.transcript.last_turns.is_empty() || is_start_sentinel(&last_user_text) {
        mem.note_topic(Section::Requirements.tag());
        mem.mark_covered(Section::Requirements);
        let output = TurnOutput::new(Section::Requirements.opener(), ResponseIntent::Clarify)
            .with_target(Target {
                node_ids: Vec::new(),
                requirement_tags: vec![Section::Requirements.tag().to_string()],
            })
            .with_evaluation(Evaluation::quality(3));
        return (output, mem);
    }

    // Diagram-change drill-down.
    if matches!(
        change,
        Some(DiagramChange::AddNode(_)) | Some(DiagramChange::Connect { .. })
    ) {
        let flagged =
            matches!(change, Some(DiagramChange::AddNode(_))) && is_no_op(change, nodes, &config.no_op);
        if flagged {
            mem.no_op_justify_attempts += 1;
        }

        let picked = pick_next_question(input, &mem, corpus, config, flagged);
        let topic_tag = topics_for_change(change).first().copied().unwrap_or("default");
        mem.record_question(&picked.composed.main, topic_tag);
        mem.push_last_asked(&picked.main_line);

        let (node_ids, requirement_tags) = match change {
            Some(DiagramChange::AddNode(node)) => (
                vec![node.id.clone()],
                vec![Topic::from_node(node).as_str().to_string()],
            ),
            _ => (Vec::new(), vec!["default".to_string()]),
        };

        let intent = if flagged {
            ResponseIntent::Challenge
        } else {
            ResponseIntent::DrillDown
        };
        let quality = (mem.skill.min(3) as u8) + 2;
        let output = TurnOutput::new(picked.composed.render(), intent)
            .with_target(Target {
                node_ids,
                requirement_tags,
            })
            .with_evaluation(Evaluation::quality(quality));
        return (output, mem);
    }

    // Substantive text answer with no fresh diagram change.
    let quality = if last_user_text.len() >= 30 && SUBSTANTIVE_ANSWER.is_match(&last_user_text) {
        4
    } else {
        3
    };
    let was_drilling = mem
        .topic_history
        .iter()
        .any(|t| COMPONENT_TOPICS.contains(&t.to_lowercase().as_str()));

    if quality >= 4 && !was_drilling {
        let next = mem.next_uncovered_section();
        mem.mark_covered(next);
        mem.note_topic(next.tag());
        let output = TurnOutput::new(next.opener(), ResponseIntent::NextTopic)
            .with_target(Target {
                node_ids: Vec::new(),
                requirement_tags: vec![next.tag().to_string()],
            })
            .with_evaluation(Evaluation::quality(quality));
        return (output, mem);
    }

    // Otherwise keep drilling where we are.
    let picked = pick_next_question(input, &mem, corpus, config, false);
    mem.record_question(&picked.composed.main, "default");
    mem.push_last_asked(&picked.main_line);

    let output = TurnOutput::new(picked.composed.render(), ResponseIntent::DrillDown)
        .with_target(Target {
            node_ids: change_node_id(change).into_iter().collect(),
            requirement_tags: Vec::new(),
        })
        .with_evaluation(Evaluation::quality(quality));
    (output, mem)
}

fn change_node_id(change: Option<&DiagramChange>) -> Option<String> {
    match change {
        Some(DiagramChange::AddNode(node)) => Some(node.id.clone()),
        Some(DiagramChange::DeleteNode { id }) | Some(DiagramChange::Move { id }) => {
            Some(id.clone())
        }
        _ => None,
    }
}

struct PickedQuestion {
    composed: ComposedQuestion,
    main_line: String,
}

/// Compose a question that has not been asked before: a bounded retry ladder
/// that re-angles the retrieval query and slides the chunk window until the
/// candidate clears both the exact-hash and the fuzzy-similarity checks. On
/// exhaustion, emit a forced "Different angle" variant rather than looping.
fn pick_next_question(
    input: &TurnInput,
    mem: &SessionMemory,
    corpus: &CorpusIndex,
    config: &EngineConfig,
    flagged_no_op: bool,
) -> PickedQuestion {
    let nodes = &input.diagram_snapshot.nodes;
    let edges = &input.diagram_snapshot.edges;
    let change = input.last_change_event.as_ref();

    let (topic, added) = match change {
        Some(DiagramChange::AddNode(node)) => (Topic::from_node(node), Some(node)),
        _ => (Topic::Default, None),
    };
    let topics = topics_for_change(change);
    let summary = action_summary(change);
    let context = extract_diagram_context(nodes, edges, added);

    let mut query =
        build_retrieval_query(&summary, &mem.last_user_answer, mem.difficulty, topics);
    let mut chunks = corpus.retrieve(&query, config.retrieval_k);

    for attempt in 0..config.max_attempts {
        let angle = ANGLES[attempt % ANGLES.len()];
        if attempt > 0 {
            query.push(' ');
            query.push_str(angle);
        }
        if attempt > 1 {
            chunks = corpus.retrieve(&query, config.retrieval_k);
        }

        let offset = attempt * 2;
        let window = if offset < chunks.len() {
            &chunks[offset..(offset + 4).min(chunks.len())]
        } else {
            &chunks[..chunks.len().min(2)]
        };

        let composed = compose(&ComposeInput {
            topic,
            chunks: window,
            difficulty: mem.difficulty,
            is_no_op: flagged_no_op,
            user_answer: &mem.last_user_answer,
            context: &context,
            traffic_load: input.traffic_load,
            action_summary: &summary,
        });

        let main_line = first_sentence(&composed.main);
        if !mem.was_asked(&composed.main)
            && !is_similar_to_last(&main_line, &mem.last_asked_questions)
        {
            debug!(attempt, angle, "Accepted composed question");
            return PickedQuestion {
                composed,
                main_line,
            };
        }
    }

    debug!(
        attempts = config.max_attempts,
        "Anti-repeat retries exhausted, forcing a different-angle variant"
    );
    let mut fallback = compose(&ComposeInput {
        topic,
        chunks: &chunks[..chunks.len().min(2)],
        difficulty: mem.difficulty,
        is_no_op: false,
        user_answer: "",
        context: &context,
        traffic_load: input.traffic_load,
        action_summary: &summary,
    });
    fallback.main = format!("Different angle: {}", fallback.main);
    let main_line = first_sentence(&fallback.main);
    PickedQuestion {
        composed: fallback,
        main_line,
    }
}

fn first_sentence(text: &str) -> String {
    text.split('.').next().unwrap_or("").trim().to_string()
}

fn normalize_for_similarity(q: &str) -> String {
    let collapsed = q.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(80).collect()
}

/// Fuzzy repeat check against recently asked first sentences: equal 80-char
/// normalized prefixes, or a 30-char prefix of one occurring in the other.
fn is_similar_to_last(question: &str, last_asked: &[String]) -> bool {
    let a = normalize_for_similarity(question);
    for prev in last_asked {
        let b = normalize_for_similarity(prev);
        if a == b {
            return true;
        }
        if a.chars().count() > 20 && b.chars().count() > 20 {
            let a_prefix: String = a.chars().take(30).collect();
            let b_prefix: String = b.chars().take(30).collect();
            if a.contains(&b_prefix) || b.contains(&a_prefix) {
                return true;
            }
        }
    }
    false
}
