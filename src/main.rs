use anyhow::Context;
use clap::Parser;
use serde_json::{Map, Value};
use sextant::cli::{Cli, Command};
use sextant::config::Settings;
use sextant::domain::TaskRequest;
use sextant::engine::OrchestrationEngine;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level: tracing::Level = cli
        .log_level
        .parse()
        .with_context(|| format!("invalid log level '{}'", cli.log_level))?;
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::new_with_cli(&cli)?;
    info!(config = %cli.config.display(), "Configuration loaded");

    let engine = OrchestrationEngine::from_settings(&settings)?;

    let output = match cli.command {
        Command::Chains => serde_json::to_value(engine.get_available_chains().await)?,
        Command::Recommend { text } => {
            let summaries: Vec<_> = engine
                .recommend_chains(&text)
                .await
                .iter()
                .map(|chain| chain.summary())
                .collect();
            serde_json::to_value(summaries)?
        }
        Command::Run { chain_id, input } => {
            let result = engine.run_chain(&chain_id, parse_object(&input)?.into()).await?;
            serde_json::to_value(result)?
        }
        Command::Auto { text, input } => {
            match engine.run_best_chain(&text, parse_object(&input)?.into()).await? {
                Some(result) => serde_json::to_value(result)?,
                None => Value::Null,
            }
        }
        Command::Collaborate {
            task_type,
            complexity,
            required,
            description,
            payload,
        } => {
            let request = TaskRequest {
                task_type,
                description,
                payload: parse_object(&payload)?,
                complexity,
                required_capabilities: required.into_iter().collect(),
            };
            serde_json::to_value(engine.run_collaborative_task(request).await?)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);

    if let Some(metrics) = engine.metrics() {
        eprintln!("{}", metrics.encode()?);
    }

    Ok(())
}

fn parse_object(raw: &str) -> anyhow::Result<Map<String, Value>> {
    match serde_json::from_str(raw).context("input is not valid JSON")? {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("expected a JSON object, got {}", other),
    }
}
