//! End-to-end dialogue flow through the public engine surface: a scripted
//! interview where the memory snapshot is threaded turn to turn, the way the
//! dialogue service drives the engine.

use drillpad_corpus::{Chunk, CorpusIndex};
use drillpad_engine::{
    heuristic_turn, DiagramChange, DiagramNode, DiagramSnapshot, EngineConfig, ResponseIntent,
    Section, SessionMemory, Transcript, TranscriptTurn, TurnInput,
};

fn corpus() -> CorpusIndex {
    let chunks = vec![
        Chunk {
            id: "cache-basics".to_string(),
            doc_id: Some("caching".to_string()),
            title: "Cache failure modes".to_string(),
            tags: vec!["cache".to_string(), "failure".to_string()],
            keywords: vec![
                "ttl".to_string(),
                "stampede".to_string(),
                "invalidation".to_string(),
            ],
            text: "When a cache node fails, hit rate drops and the database absorbs the \
                   difference. Thundering herds amplify this."
                .to_string(),
        },
        Chunk {
            id: "queue-semantics".to_string(),
            doc_id: Some("queues".to_string()),
            title: "Delivery semantics".to_string(),
            tags: vec!["queue".to_string()],
            keywords: vec!["idempotency".to_string(), "dlq".to_string()],
            text: "At-least-once delivery requires idempotent consumers. Poison messages \
                   need a dead letter queue."
                .to_string(),
        },
        Chunk {
            id: "shard-rebalance".to_string(),
            doc_id: Some("sharding".to_string()),
            title: "Hot partitions".to_string(),
            tags: vec!["shard".to_string()],
            keywords: vec!["resharding".to_string(), "partition-key".to_string()],
            text: "A skewed partition key concentrates load on one shard. Rebalancing \
                   moves ranges while serving traffic."
                .to_string(),
        },
    ];
    CorpusIndex::build(chunks)
}

struct Session {
    corpus: CorpusIndex,
    config: EngineConfig,
    memory: SessionMemory,
    transcript: Vec<TranscriptTurn>,
    nodes: Vec<DiagramNode>,
}

impl Session {
    fn new() -> Self {
        Self {
            corpus: corpus(),
            config: EngineConfig::default(),
            memory: SessionMemory::default(),
            transcript: Vec::new(),
            nodes: Vec::new(),
        }
    }

    fn turn(&mut self, user_text: &str, change: Option<DiagramChange>) -> drillpad_engine::TurnOutput {
        if !user_text.is_empty() {
            self.transcript.push(TranscriptTurn::user(user_text));
        }
        if let Some(DiagramChange::AddNode(ref node)) = change {
            self.nodes.push(node.clone());
        }
        let input = TurnInput {
            diagram_snapshot: DiagramSnapshot {
                nodes: self.nodes.clone(),
                ..Default::default()
            },
            last_change_event: change,
            transcript: Transcript {
                last_turns: self.transcript.clone(),
            },
            traffic_load: 12_000,
            ..Default::default()
        };
        let (output, memory) = heuristic_turn(&input, self.memory.clone(), &self.corpus, &self.config);
        self.memory = memory;
        self.transcript
            .push(TranscriptTurn::interviewer(&output.interviewer_message));
        output
    }

    fn add(&mut self, id: &str, label: &str) -> Option<DiagramChange> {
        Some(DiagramChange::AddNode(DiagramNode::new(id, label)))
    }
}

#[test]
fn test_full_session_opens_drills_and_advances() {
    let mut session = Session::new();

    // Turn 1: nothing yet, the engine opens with requirements.
    let out = session.turn("", None);
    assert_eq!(out.interviewer_message, Section::Requirements.opener());
    assert!(session.memory.is_covered(Section::Requirements));

    // Turn 2: a substantive requirements answer advances to high-level design.
    let out = session.turn(
        "Core flows are uploads and feeds, 100 million daily actives, reads dominate",
        None,
    );
    assert_eq!(out.intent, ResponseIntent::NextTopic);
    assert_eq!(out.interviewer_message, Section::Hld.opener());
    assert!(session.memory.is_covered(Section::Hld));

    // Turn 3: adding a cache triggers a drill-down targeted at that node.
    let change = session.add("cache-1", "Redis Cache");
    let out = session.turn("I put a cache in front of the database", change);
    assert_eq!(out.intent, ResponseIntent::DrillDown);
    assert_eq!(out.target.node_ids, vec!["cache-1"]);
    assert_eq!(out.target.requirement_tags, vec!["cache"]);
    assert!(out.interviewer_message.to_lowercase().contains("cache"));

    // Turn 4: while drilling a component, a good answer keeps drilling
    // instead of jumping sections.
    let out = session.turn(
        "On cache node failure hit rate drops to 70% and the database sees triple QPS",
        None,
    );
    assert_eq!(out.intent, ResponseIntent::DrillDown);
    assert_eq!(out.evaluation.answer_quality, 4);

    // The asked-question ledger grew and nothing repeated.
    let unique: std::collections::HashSet<_> =
        session.memory.asked_question_hashes.iter().collect();
    assert_eq!(unique.len(), session.memory.asked_question_hashes.len());
}

#[test]
fn test_help_then_confusion_then_recovery() {
    let mut session = Session::new();
    session.turn("", None);

    let change = session.add("q1", "Message Queue");
    session.turn("added a queue", change);

    // "help" gets coaching with a worked example, not a new question.
    let before_hashes = session.memory.asked_question_hashes.len();
    let out = session.turn("help", None);
    assert_eq!(out.intent, ResponseIntent::Clarify);
    assert!(out.interviewer_message.contains("Worked example"));
    assert_eq!(session.memory.coach_follow_up_index, 1);
    assert_eq!(session.memory.mode, "COACH");
    // Coaching never burns a question.
    assert_eq!(session.memory.asked_question_hashes.len(), before_hashes);

    // A second help request rotates to a different follow-up.
    let out2 = session.turn("I still don't get it, explain", None);
    assert_eq!(session.memory.coach_follow_up_index, 2);
    assert_ne!(out.interviewer_message, out2.interviewer_message);
}

#[test]
fn test_offtopic_never_derails_memory() {
    let mut session = Session::new();
    session.turn("", None);

    let before = session.memory.clone();
    let out = session.turn("tell me a joke", None);
    assert_eq!(out.intent, ResponseIntent::Clarify);
    assert!(out.interviewer_message.contains("stay focused"));
    assert_eq!(out.evaluation.answer_quality, 2);
    // Off-topic chatter leaves topics and counters where they were.
    assert_eq!(before.topic_history, session.memory.topic_history);
    assert_eq!(
        before.asked_question_hashes,
        session.memory.asked_question_hashes
    );
}

#[test]
fn test_duplicate_component_escalation() {
    let mut session = Session::new();
    session.turn("", None);
    session.turn(
        "Requirements are 10K QPS with p99 under 200 ms for availability",
        None,
    );

    // Two caches already exist; a third is challenged as unnecessary.
    session.nodes.push(DiagramNode::new("c1", "Cache"));
    session.nodes.push(DiagramNode::new("c2", "Cache"));
    let change = session.add("c3", "Cache");
    let out = session.turn("adding one more cache here", change);
    assert_eq!(out.intent, ResponseIntent::Challenge);
    assert_eq!(session.memory.no_op_justify_attempts, 1);

    // Insisting on the same duplicate gets the removal push, not a repeat.
    let change = session.add("c4", "Cache");
    let out = session.turn("I think more caches always help", change);
    assert_eq!(out.intent, ResponseIntent::Challenge);
    assert!(out.interviewer_message.contains("removing"));
    assert_eq!(session.memory.no_op_justify_attempts, 1);
}

#[test]
fn test_skill_adjusts_difficulty_over_time() {
    let mut session = Session::new();
    session.turn("", None);

    for _ in 0..4 {
        session.turn(
            "Write-through keeps 300 seconds TTL; that's a latency vs consistency tradeoff",
            None,
        );
    }
    assert!(session.memory.skill >= 4);
    assert!(session.memory.difficulty >= 3);

    let skilled = session.memory.difficulty;
    for _ in 0..3 {
        session.turn("idk not sure", None);
    }
    assert!(session.memory.difficulty <= skilled);
}

#[test]
fn test_long_reflection_is_evaluated_not_questioned() {
    let mut session = Session::new();
    session.turn("", None);

    let reflection = "I believe the overall design holds up because the cache absorbs most \
                      reads while the queue smooths the write path and the database only \
                      sees steady load even during spikes in traffic";
    let out = session.turn(reflection, None);
    assert_eq!(out.intent, ResponseIntent::DrillDown);
    assert!(out.interviewer_message.starts_with("Good."));
    assert_eq!(out.evaluation.answer_quality, 4);
}

#[test]
fn test_factually_wrong_claim_is_challenged_immediately() {
    let mut session = Session::new();
    session.turn("", None);
    let before = session.memory.clone();

    let out = session.turn("our message queue guarantees order globally", None);
    assert_eq!(out.intent, ResponseIntent::Challenge);
    assert_eq!(out.evaluation.issues, vec!["Incorrect"]);
    assert_eq!(before, session.memory);
}
