use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "orchestrator-cli")]
#[command(about = "Management CLI for a running service orchestrator", long_about = None)]
struct Cli {
    /// Base URL of the listener to talk to.
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe the health endpoint
    Health {
        #[arg(long, default_value = "/health")]
        path: String,
    },
    /// Read or change the active log filter through the logging API
    LogLevel {
        #[command(subcommand)]
        action: LogLevelAction,
    },
}

#[derive(Subcommand)]
enum LogLevelAction {
    /// Print the current filter
    Get,
    /// Replace the filter, e.g. `info,service_orchestrator=debug`
    Set { filter: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Health { path } => client.get(format!("{base}{path}")).send().await?,
        Commands::LogLevel { action: LogLevelAction::Get } => {
            client.get(format!("{base}/logging/level")).send().await?
        }
        Commands::LogLevel {
            action: LogLevelAction::Set { filter },
        } => {
            client
                .put(format!("{base}/logging/level"))
                .json(&json!({ "filter": filter }))
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    let body = serde_json::from_str::<Value>(&text)
        .and_then(|v| serde_json::to_string_pretty(&v))
        .unwrap_or(text);

    if status.is_success() {
        println!("{body}");
        Ok(())
    } else {
        eprintln!("Error: server returned status {status}");
        eprintln!("{body}");
        std::process::exit(1);
    }
}
