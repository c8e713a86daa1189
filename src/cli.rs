use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Sextant - tool chain and multi-agent orchestration
#[derive(Parser, Debug, Clone)]
#[command(name = "sextant", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "SEXTANT_CONFIG", default_value = "sextant.toml")]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "SEXTANT_LOG", default_value = "info")]
    pub log_level: String,

    /// Collect Prometheus metrics and print them after the command
    #[arg(long, env = "SEXTANT_METRICS")]
    pub metrics: bool,

    /// Append decision records to this JSON-lines file
    #[arg(long, env = "SEXTANT_DECISION_LOG")]
    pub decision_log: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List registered chains
    Chains,

    /// Rank chains against a request
    Recommend {
        /// Free-text request
        text: String,
    },

    /// Run a chain by id
    Run {
        chain_id: String,

        /// Initial context as a JSON object
        #[arg(long, default_value = "{}")]
        input: String,
    },

    /// Recommend and run the best matching chain
    Auto {
        text: String,

        /// Initial context as a JSON object
        #[arg(long, default_value = "{}")]
        input: String,
    },

    /// Run a collaborative multi-agent task
    Collaborate {
        #[arg(long)]
        task_type: String,

        /// Task complexity, 1-10
        #[arg(long, default_value_t = 5)]
        complexity: u8,

        /// Required expertise tag (repeatable)
        #[arg(long = "require")]
        required: Vec<String>,

        #[arg(long, default_value = "")]
        description: String,

        /// Payload handed to every agent, as a JSON object
        #[arg(long, default_value = "{}")]
        payload: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["sextant", "chains"]);
        assert_eq!(cli.config, PathBuf::from("sextant.toml"));
        assert_eq!(cli.log_level, "info");
        assert!(!cli.metrics);
        assert!(cli.decision_log.is_none());
        assert!(matches!(cli.command, Command::Chains));
    }

    #[test]
    fn test_cli_run_with_args() {
        let cli = Cli::parse_from([
            "sextant",
            "--config",
            "custom.toml",
            "--metrics",
            "--decision-log",
            "data/audit.jsonl",
            "run",
            "property_analysis",
            "--input",
            r#"{"propertyId":"p1"}"#,
        ]);
        assert_eq!(cli.config, PathBuf::from("custom.toml"));
        assert!(cli.metrics);
        assert_eq!(cli.decision_log, Some(PathBuf::from("data/audit.jsonl")));
        match cli.command {
            Command::Run { chain_id, input } => {
                assert_eq!(chain_id, "property_analysis");
                assert_eq!(input, r#"{"propertyId":"p1"}"#);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_collaborate() {
        let cli = Cli::parse_from([
            "sextant",
            "collaborate",
            "--task-type",
            "underwriting",
            "--complexity",
            "8",
            "--require",
            "valuation",
            "--require",
            "risk",
        ]);
        match cli.command {
            Command::Collaborate {
                task_type,
                complexity,
                required,
                description,
                payload,
            } => {
                assert_eq!(task_type, "underwriting");
                assert_eq!(complexity, 8);
                assert_eq!(required, vec!["valuation", "risk"]);
                assert!(description.is_empty());
                assert_eq!(payload, "{}");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
