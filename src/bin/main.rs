use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use tracing::info;
use tracing_subscriber::EnvFilter;

use mcp_docker::rpc_client::{DEFAULT_ENDPOINT, RpcClient};
use mcp_docker::{AppConfig, McpServer, RpcResponse, ServiceOptions, builtin_registry, create_orchestrator};

#[derive(Parser)]
#[command(name = "mcp-docker")]
#[command(about = "Natural-language Docker automation over JSON-RPC and MCP")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the JSON-RPC HTTP server
    Serve {
        /// Bind address, e.g. 0.0.0.0:1234
        #[arg(long, env = "MCP_DOCKER_BIND")]
        bind: Option<String>,
        /// Docker engine address (unix://, tcp:// or http://)
        #[arg(long)]
        docker_host: Option<String>,
        /// Simulate the engine in memory
        #[arg(long, default_value_t = false)]
        dry_run: bool,
        /// Start without a language model
        #[arg(long, default_value_t = false)]
        no_llm: bool,
    },
    /// Run as an MCP stdio server (for use in mcp.json)
    McpStdio {
        #[arg(long)]
        docker_host: Option<String>,
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Generate a plan for an instruction on a running server, then execute it
    Run {
        instruction: String,
        #[arg(long, default_value = DEFAULT_ENDPOINT)]
        endpoint: String,
        /// Print the generated plan without executing it
        #[arg(long, default_value_t = false)]
        plan_only: bool,
    },
    /// Invoke one tool directly on a running server
    Call {
        tool: String,
        /// Tool parameters as a JSON object
        #[arg(long, default_value = "{}")]
        params: String,
        #[arg(long, default_value = DEFAULT_ENDPOINT)]
        endpoint: String,
    },
    /// Print the built-in tool catalogue
    Tools,
}

const DEFAULT_LOG_DIRECTIVES: &str = "mcp_docker=info,rmcp=warn";

/// `RUST_LOG` replaces the default directives when it parses.
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|s| !s.trim().is_empty())
        .and_then(|s| EnvFilter::try_new(s).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_DIRECTIVES))
}

fn init_tracing(stderr: bool) {
    let rust_log = std::env::var("RUST_LOG").ok();
    let builder = tracing_subscriber::fmt().with_env_filter(log_filter(rust_log.as_deref()));

    // stdout is the protocol channel in stdio mode
    if stderr {
        builder.with_writer(std::io::stderr).init();
    } else {
        builder.init();
    }
}

fn print_response(response: &RpcResponse) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(matches!(cli.command, Commands::McpStdio { .. }));

    match cli.command {
        Commands::Serve {
            bind,
            docker_host,
            dry_run,
            no_llm,
        } => {
            let mut config = AppConfig::load()?;
            if let Some(bind) = bind {
                config.bind = bind;
            }
            if docker_host.is_some() {
                config.docker.host = docker_host;
            }

            let orchestrator = create_orchestrator(&config, ServiceOptions { dry_run, no_llm })?;
            let app = mcp_docker::api::create_router(orchestrator);

            let listener = tokio::net::TcpListener::bind(&config.bind)
                .await
                .with_context(|| format!("Failed to bind {}", config.bind))?;
            info!("JSON-RPC server listening on http://{}/rpc", config.bind);

            axum::serve(listener, app).await?;
        }
        Commands::McpStdio {
            docker_host,
            dry_run,
        } => {
            let mut config = AppConfig::load()?;
            if docker_host.is_some() {
                config.docker.host = docker_host;
            }

            let orchestrator = create_orchestrator(
                &config,
                ServiceOptions {
                    dry_run,
                    no_llm: true,
                },
            )?;
            mcp_docker::server::serve_stdio(McpServer::new(orchestrator))
                .await
                .inspect_err(|e| tracing::error!("serving error: {:?}", e))?;
        }
        Commands::Run {
            instruction,
            endpoint,
            plan_only,
        } => {
            let client = RpcClient::new(endpoint)?;
            let plan = client.generate_plan(&instruction).await?;

            let pretty = serde_json::from_str::<Value>(&plan)
                .and_then(|v| serde_json::to_string_pretty(&v))
                .unwrap_or_else(|_| plan.clone());
            println!("Plan:\n{}", pretty);

            if !plan_only {
                let response = client.execute_plan(&plan).await?;
                println!("Result:");
                print_response(&response)?;
            }
        }
        Commands::Call {
            tool,
            params,
            endpoint,
        } => {
            let parameters: Map<String, Value> =
                serde_json::from_str(&params).context("--params must be a JSON object")?;
            let client = RpcClient::new(endpoint)?;
            let response = client.call_tool(&tool, parameters).await?;
            print_response(&response)?;
        }
        Commands::Tools => {
            let registry = builtin_registry(mcp_docker::tools::DEFAULT_PULL_TIMEOUT);
            println!("{}", serde_json::to_string_pretty(&registry.descriptors())?);
        }
    }

    Ok(())
}
