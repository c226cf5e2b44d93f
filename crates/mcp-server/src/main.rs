//! Issue Graph MCP Server
//!
//! Renders the relationship graph around a GitHub issue or pull request for AI agents via MCP
//! protocol.
//!
//! ## Tools
//!
//! - `issue_graph` - Parents, sub-issues, tasklist links and cross-references around one item,
//!   optionally re-centered on the nearest epic or batch
//!
//! ## Environment
//!
//! - `ISSUE_GRAPH_SNAPSHOT` - JSON snapshot of issues the server answers from
//! - `ISSUE_GRAPH_MAX_DEPTH`, `ISSUE_GRAPH_MAX_NODES`, `ISSUE_GRAPH_MAX_CONCURRENCY`,
//!   `ISSUE_GRAPH_MAX_PER_REPO`, `ISSUE_GRAPH_TIMEOUT_MS` - crawl limits
//!
//! ## Usage
//!
//! Add to your MCP client configuration:
//! ```json
//! {
//!   "mcpServers": {
//!     "issue-graph": {
//!       "command": "issue-graph-mcp",
//!       "env": { "ISSUE_GRAPH_SNAPSHOT": "/path/to/issues.json" }
//!     }
//!   }
//! }
//! ```

use anyhow::Result;
use rmcp::ServiceExt;
use std::env;

mod tools;

use tools::catalog;
use tools::IssueGraphService;

const USAGE: &str = "\
Usage: issue-graph-mcp [FLAG]

Serves the issue_graph tool over stdio when no flag is given.

  --print-tools   tool definitions as JSON
  -V, --version   version
  -h, --help      this text";

/// What a command line asks for besides serving
enum CliAction {
    PrintTools,
    Version,
    Help,
}

impl CliAction {
    /// `Ok(None)` means serve; unrecognised input is returned as the error.
    fn parse(args: &[String]) -> Result<Option<Self>, String> {
        match args {
            [] => Ok(None),
            [flag] => match flag.as_str() {
                "--print-tools" => Ok(Some(Self::PrintTools)),
                "--version" | "-V" => Ok(Some(Self::Version)),
                "--help" | "-h" => Ok(Some(Self::Help)),
                _ => Err(flag.clone()),
            },
            _ => Err(args.join(" ")),
        }
    }

    fn run(&self) {
        let version = env!("CARGO_PKG_VERSION");
        match self {
            Self::PrintTools => println!("{}", catalog::tool_inventory_json(version)),
            Self::Version => println!("issue-graph-mcp {version}"),
            Self::Help => println!("{USAGE}"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    match CliAction::parse(&args) {
        Ok(None) => {}
        Ok(Some(action)) => {
            action.run();
            return Ok(());
        }
        Err(unknown) => {
            eprintln!("Unknown arguments: {unknown}\n\n{USAGE}");
            std::process::exit(2);
        }
    }

    // Configure logging to stderr only (stdout is for MCP protocol)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    log::info!("Starting Issue Graph MCP server");

    let service = IssueGraphService::from_env()?;
    let server = service.serve(rmcp::transport::stdio()).await?;

    // Wait for shutdown
    server.waiting().await?;

    log::info!("Issue Graph MCP server stopped");
    Ok(())
}
