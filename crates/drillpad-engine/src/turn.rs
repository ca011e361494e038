use serde::{Deserialize, Serialize};

/// Summary of the question pack driving the interview. Built elsewhere;
/// consumed here as opaque context.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuestionPackSummary {
    pub title: String,
    pub problem_statement: String,
    pub functional_requirements: Vec<String>,
    pub non_functional_requirements: Vec<String>,
}

/// A node on the design canvas.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DiagramNode {
    pub id: String,
    pub label: String,
}

impl DiagramNode {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }

    /// Display label, falling back to the id.
    pub fn display_label(&self) -> &str {
        if self.label.trim().is_empty() {
            &self.id
        } else {
            &self.label
        }
    }
}

/// A directed edge on the design canvas.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DiagramEdge {
    pub source: String,
    pub target: String,
}

/// The caller's current view of the diagram.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DiagramSnapshot {
    pub nodes: Vec<DiagramNode>,
    pub edges: Vec<DiagramEdge>,
    pub selected_node_ids: Vec<String>,
    pub highlighted_issues: Vec<String>,
}

/// One diagram edit, supplied per turn. Each variant carries only the fields
/// it needs; the engine never inspects a loose payload object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum DiagramChange {
    AddNode(DiagramNode),
    DeleteNode { id: String },
    Connect { source: String, target: String },
    DeleteEdge { source: String, target: String },
    Move { id: String },
}

/// One prior exchange in the transcript. Roles are free-form strings from the
/// caller; only "user" and "interviewer" are meaningful.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TranscriptTurn {
    pub role: String,
    pub text: String,
}

impl TranscriptTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            text: text.into(),
        }
    }

    pub fn interviewer(text: impl Into<String>) -> Self {
        Self {
            role: "interviewer".to_string(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Transcript {
    pub last_turns: Vec<TranscriptTurn>,
}

impl Transcript {
    /// Last user utterance, trimmed.
    pub fn last_user_text(&self) -> &str {
        self.last_turns
            .iter()
            .rev()
            .find(|t| t.role == "user")
            .map(|t| t.text.trim())
            .unwrap_or("")
    }

    /// Last interviewer message.
    pub fn last_interviewer_text(&self) -> &str {
        self.last_turns
            .iter()
            .rev()
            .find(|t| t.role == "interviewer")
            .map(|t| t.text.as_str())
            .unwrap_or("")
    }
}

pub const DEFAULT_TRAFFIC_LOAD: u64 = 1000;

/// Change events come from callers the engine does not control. An unknown
/// `type`, a missing payload, or a null all read as "no change event" instead
/// of failing the whole `TurnInput`.
fn lenient_change_event<'de, D>(deserializer: D) -> Result<Option<DiagramChange>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Everything the engine consumes for one turn. Every field is defaulted so a
/// missing or malformed field never aborts processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TurnInput {
    pub question_pack_summary: QuestionPackSummary,
    pub diagram_snapshot: DiagramSnapshot,
    #[serde(deserialize_with = "lenient_change_event")]
    pub last_change_event: Option<DiagramChange>,
    pub traffic_load: u64,
    pub transcript: Transcript,
}

impl Default for TurnInput {
    fn default() -> Self {
        Self {
            question_pack_summary: QuestionPackSummary::default(),
            diagram_snapshot: DiagramSnapshot::default(),
            last_change_event: None,
            traffic_load: DEFAULT_TRAFFIC_LOAD,
            transcript: Transcript::default(),
        }
    }
}

/// What kind of move the interviewer made this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseIntent {
    Clarify,
    DrillDown,
    Challenge,
    Validate,
    NextTopic,
    WrapUp,
}

impl Default for ResponseIntent {
    fn default() -> Self {
        ResponseIntent::DrillDown
    }
}

/// What the response is aimed at.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Target {
    pub node_ids: Vec<String>,
    pub requirement_tags: Vec<String>,
}

/// Assessment of the user's last answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Evaluation {
    /// 1..=5, clamped.
    pub answer_quality: u8,
    pub issues: Vec<String>,
    pub missing: Vec<String>,
}

impl Default for Evaluation {
    fn default() -> Self {
        Self {
            answer_quality: 3,
            issues: Vec::new(),
            missing: Vec::new(),
        }
    }
}

impl Evaluation {
    pub fn quality(answer_quality: u8) -> Self {
        Self {
            answer_quality: answer_quality.clamp(1, 5),
            ..Default::default()
        }
    }

    pub fn with_issue(mut self, issue: impl Into<String>) -> Self {
        self.issues.push(issue.into());
        self
    }
}

/// The interviewer response for one turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TurnOutput {
    pub interviewer_message: String,
    pub intent: ResponseIntent,
    pub target: Target,
    pub evaluation: Evaluation,
    pub next_actions: Vec<String>,
}

impl TurnOutput {
    pub fn new(message: impl Into<String>, intent: ResponseIntent) -> Self {
        Self {
            interviewer_message: message.into(),
            intent,
            ..Default::default()
        }
    }

    pub fn with_evaluation(mut self, evaluation: Evaluation) -> Self {
        self.evaluation.answer_quality = evaluation.answer_quality.clamp(1, 5);
        self.evaluation.issues = evaluation.issues;
        self.evaluation.missing = evaluation.missing;
        self
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }
}
