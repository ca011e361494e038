use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use colored::Colorize;
use serde::Deserialize;

use drillpad_corpus::CorpusIndex;
use drillpad_engine::{
    DiagramChange, DiagramNode, DiagramSnapshot, SessionMemory, Transcript, TranscriptTurn,
    TurnInput, TurnRunner,
};

use crate::config::ProjectConfig;
use crate::transcript::{TranscriptLine, TranscriptWriter};

/// One scripted exchange: what the candidate says and what they did to the
/// diagram before saying it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScriptStep {
    pub user_text: String,
    pub change: Option<DiagramChange>,
    pub traffic_load: Option<u64>,
}

fn demo_script() -> Vec<ScriptStep> {
    fn say(text: &str) -> ScriptStep {
        ScriptStep {
            user_text: text.to_string(),
            ..Default::default()
        }
    }
    fn add(id: &str, label: &str, text: &str) -> ScriptStep {
        ScriptStep {
            user_text: text.to_string(),
            change: Some(DiagramChange::AddNode(DiagramNode::new(id, label))),
            ..Default::default()
        }
    }

    vec![
        say("[Ready to start]"),
        say("Core use cases are shortening URLs and redirecting, 10K QPS reads, p99 under 100 ms"),
        add("lb-1", "Load Balancer", "traffic goes through a load balancer first"),
        add("cache-1", "Redis Cache", "added a cache for hot redirects"),
        say("what's the weather like where you are"),
        say("help"),
        say("If hit rate drops from 90% to 70%, the database sees 3x the read QPS"),
        add("db-1", "Database", "reads that miss go to the database"),
        say(
            "I think this holds up overall because the cache absorbs most redirect reads \
             and the load balancer spreads whatever is left across the app tier evenly",
        ),
    ]
}

/// Drive a scripted interview through the engine, printing the dialogue and
/// writing a transcript JSONL file. Useful for eyeballing dialogue quality
/// after tuning the composer or the corpus.
pub async fn run(
    session: &str,
    script_path: Option<&PathBuf>,
    index: &CorpusIndex,
    config: &ProjectConfig,
) -> Result<()> {
    let script: Vec<ScriptStep> = match script_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read script: {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse script: {}", path.display()))?
        }
        None => demo_script(),
    };

    let generator = config.generator();
    let mut runner = TurnRunner::new(index, config.engine.clone());
    if let Some((backend, generator_config)) = generator.as_ref() {
        runner = runner.with_generator(backend, generator_config.clone());
    }

    let writer = TranscriptWriter::new(session).context("Failed to create transcript file")?;
    writer.write(&TranscriptLine::SessionStart {
        timestamp: Utc::now(),
        session_id: session.to_string(),
        pack_title: "simulated interview".to_string(),
    });

    let mut memory = SessionMemory::default();
    let mut transcript: Vec<TranscriptTurn> = Vec::new();
    let mut nodes: Vec<DiagramNode> = Vec::new();
    let mut turns = 0usize;

    for step in script {
        if let Some(DiagramChange::AddNode(ref node)) = step.change {
            nodes.push(node.clone());
        }
        if !step.user_text.is_empty() {
            transcript.push(TranscriptTurn::user(&step.user_text));
            println!("{} {}", "candidate:".green().bold(), step.user_text);
        }

        let input = TurnInput {
            diagram_snapshot: DiagramSnapshot {
                nodes: nodes.clone(),
                ..Default::default()
            },
            last_change_event: step.change.clone(),
            transcript: Transcript {
                last_turns: transcript.clone(),
            },
            traffic_load: step.traffic_load.unwrap_or(10_000),
            ..Default::default()
        };

        let (output, next_memory) = runner.process_turn(&input, memory).await;
        memory = next_memory;
        turns += 1;

        println!("{} {}", "interviewer:".blue().bold(), output.interviewer_message);
        println!(
            "{}",
            format!(
                "  [intent={:?} quality={} difficulty={}]",
                output.intent, output.evaluation.answer_quality, memory.difficulty
            )
            .dimmed()
        );

        writer.write(&TranscriptLine::Turn {
            timestamp: Utc::now(),
            user_text: step.user_text.clone(),
            change_summary: memory.last_action_summary.clone(),
            interviewer_message: output.interviewer_message.clone(),
            intent: format!("{:?}", output.intent),
            answer_quality: output.evaluation.answer_quality,
            difficulty: memory.difficulty,
        });

        transcript.push(TranscriptTurn::interviewer(&output.interviewer_message));
    }

    let covered: Vec<String> = memory
        .covered_sections
        .iter()
        .filter(|(_, done)| **done)
        .map(|(section, _)| section.tag().to_string())
        .collect();
    writer.write(&TranscriptLine::SessionEnd {
        timestamp: Utc::now(),
        turns,
        covered_sections: covered,
    });

    println!(
        "\n{} {}",
        "transcript:".bold(),
        writer.path().display()
    );
    Ok(())
}
