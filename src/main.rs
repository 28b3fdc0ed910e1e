use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use webhook_retrier::commands::{SendOptions, send};
use webhook_retrier::config::RetrierConfig;

/// webhook-retrier - reliable webhook delivery
///
/// Sends a payload to a webhook endpoint, retrying with backoff until the
/// endpoint accepts it or the retry budget runs out.
///
/// Examples:
///   webhook-retrier send https://example.com/hook -d '{"hello":"world"}'
///   webhook-retrier send https://example.com/hook --data-file event.json -H 'X-Signature: abc'
#[derive(Parser, Debug)]
#[command(author, version = env!("WEBHOOK_RETRIER_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Retrier config file in JSON (also via WEBHOOK_RETRIER_CONFIG)
    #[arg(
        long = "config",
        short = 'c',
        env = "WEBHOOK_RETRIER_CONFIG",
        value_name = "PATH",
        global = true
    )]
    pub config: Option<PathBuf>,

    /// Per-attempt timeout in milliseconds
    #[arg(long = "timeout-ms", value_name = "MS", global = true)]
    pub timeout_ms: Option<u64>,

    /// Total retry budget in milliseconds
    #[arg(long = "max-elapsed-ms", value_name = "MS", global = true)]
    pub max_elapsed_ms: Option<u64>,

    /// Maximum number of attempts, including the first one
    #[arg(long = "max-attempts", value_name = "N", global = true)]
    pub max_attempts: Option<u32>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Deliver a payload to a webhook URL
    Send(SendArgs),
}

#[derive(clap::Args, Debug)]
pub struct SendArgs {
    /// Destination URL
    #[arg(value_name = "URL")]
    pub url: String,

    /// HTTP method
    #[arg(long, short = 'X', default_value = "POST")]
    pub method: String,

    /// Extra request header, repeatable
    #[arg(long = "header", short = 'H', value_name = "NAME:VALUE")]
    pub headers: Vec<String>,

    /// Content-Type header
    #[arg(long = "content-type", default_value = "application/json")]
    pub content_type: String,

    /// Payload given inline
    #[arg(long, short = 'd', conflicts_with = "data_file")]
    pub data: Option<String>,

    /// Payload file, or - for stdin
    #[arg(long = "data-file", value_name = "PATH")]
    pub data_file: Option<PathBuf>,
}

impl Cli {
    fn retrier_config(&self) -> Result<RetrierConfig> {
        let mut config = match &self.config {
            Some(path) => RetrierConfig::from_file(path)?,
            None => RetrierConfig::default(),
        };
        if let Some(timeout_ms) = self.timeout_ms {
            config.attempt_timeout_ms = timeout_ms;
        }
        if let Some(max_elapsed_ms) = self.max_elapsed_ms {
            config.max_elapsed_ms = max_elapsed_ms;
        }
        if let Some(max_attempts) = self.max_attempts {
            config.max_attempts = Some(max_attempts);
        }
        Ok(config)
    }
}

impl From<SendArgs> for SendOptions {
    fn from(args: SendArgs) -> Self {
        Self {
            url: args.url,
            method: args.method,
            headers: args.headers,
            content_type: Some(args.content_type),
            data: args.data,
            data_file: args.data_file,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let config = cli.retrier_config()?;

    match cli.command {
        Commands::Send(args) => send(&config, &SendOptions::from(args)).await?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_send_parsing() {
        let cli = Cli::try_parse_from(["webhook-retrier", "send", "https://example.com/hook"])
            .unwrap();
        let Commands::Send(args) = cli.command;
        assert_eq!(args.url, "https://example.com/hook");
        assert_eq!(args.method, "POST");
        assert_eq!(args.content_type, "application/json");
        assert!(args.headers.is_empty());
        assert_eq!(cli.config, None);
    }

    #[test]
    fn test_cli_send_headers_and_data() {
        let cli = Cli::try_parse_from([
            "webhook-retrier",
            "send",
            "https://example.com/hook",
            "-H",
            "X-A: 1",
            "--header",
            "X-B: 2",
            "-d",
            "{}",
        ])
        .unwrap();
        let Commands::Send(args) = cli.command;
        assert_eq!(args.headers, vec!["X-A: 1", "X-B: 2"]);
        assert_eq!(args.data.as_deref(), Some("{}"));
    }

    #[test]
    fn test_cli_data_conflicts_with_data_file() {
        let result = Cli::try_parse_from([
            "webhook-retrier",
            "send",
            "https://example.com/hook",
            "-d",
            "{}",
            "--data-file",
            "event.json",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_global_overrides() {
        let cli = Cli::try_parse_from([
            "webhook-retrier",
            "--timeout-ms",
            "250",
            "send",
            "https://example.com/hook",
            "--max-attempts",
            "2",
        ])
        .unwrap();
        let config = cli.retrier_config().unwrap();
        assert_eq!(config.attempt_timeout_ms, 250);
        assert_eq!(config.max_attempts, Some(2));
        assert_eq!(config.max_elapsed_ms, RetrierConfig::default().max_elapsed_ms);
    }

    #[test]
    fn test_cli_no_subcommand_fails() {
        let result = Cli::try_parse_from(["webhook-retrier", "https://example.com/hook"]);
        assert!(result.is_err());
    }
}
