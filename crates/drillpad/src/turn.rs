use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use drillpad_corpus::CorpusIndex;
use drillpad_engine::{TurnInput, TurnRunner};

use crate::config::ProjectConfig;
use crate::store::StateStore;

/// Run one interview turn: read a `TurnInput` JSON document, advance the
/// session, print the `TurnOutput` JSON on stdout. Logs go to stderr so the
/// output stays machine-readable.
pub async fn run(
    session: &str,
    input_path: Option<&PathBuf>,
    index: &CorpusIndex,
    config: &ProjectConfig,
    store: &StateStore,
) -> Result<()> {
    let raw = match input_path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read turn input: {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read turn input from stdin")?;
            buf
        }
    };
    let input: TurnInput =
        serde_json::from_str(&raw).context("Turn input is not valid JSON")?;

    let generator = config.generator();
    let mut runner = TurnRunner::new(index, config.engine.clone());
    if let Some((backend, generator_config)) = generator.as_ref() {
        runner = runner.with_generator(backend, generator_config.clone());
    }

    // One turn at a time per session, across processes.
    let _guard = store.lock_session(session)?;

    let memory = store.load(session)?;
    let (output, memory) = runner.process_turn(&input, memory).await;
    store.save(session, &memory)?;

    info!(
        session,
        intent = ?output.intent,
        difficulty = memory.difficulty,
        "Turn processed"
    );
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
