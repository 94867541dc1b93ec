mod call;
mod credential;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "slack-mcp", about = "Multi-tenant Slack tool gateway")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Manage tenant credentials in the local store
    Credential {
        #[command(subcommand)]
        command: credential::CredentialCommand,
    },
    /// Invoke a tool on a running gateway
    Call {
        /// Tool name, e.g. "post_message"
        #[arg(long)]
        tool: String,

        /// Tenant (team) id
        #[arg(long)]
        team: String,

        /// Acting user id
        #[arg(long)]
        user: String,

        /// Tool-specific arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,

        /// Gateway WebSocket URL
        #[arg(long, default_value = "ws://127.0.0.1:3000/ws")]
        url: String,

        /// Bearer token for authentication
        #[arg(long)]
        token: Option<String>,
    },
    /// Check gateway health
    Health {
        /// Gateway base URL
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        url: String,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let rt = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Serve { port } => rt.block_on(async {
            let config = slack_mcp_config::load_config()?;
            slack_mcp_gateway::start_gateway(config, port).await
        }),
        Commands::Credential { command } => rt.block_on(async {
            let config = slack_mcp_config::load_config()?;
            let db_path = config.resolve_database_path()?;
            credential::run(command, &db_path).await
        }),
        Commands::Call {
            tool,
            team,
            user,
            args,
            url,
            token,
        } => rt.block_on(call::run_call(tool, team, user, args, url, token)),
        Commands::Health { url } => rt.block_on(async move {
            let body: serde_json::Value = reqwest::get(format!("{url}/health"))
                .await?
                .error_for_status()?
                .json()
                .await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(())
        }),
    }
}
