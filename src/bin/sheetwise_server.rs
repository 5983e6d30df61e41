//! Sheetwise API Server binary
//!
//! HTTP REST API over the lookup, pivot and concatenation jobs.

use std::path::PathBuf;

use clap::Parser;
use sheetwise::api::{run_api_server, ApiConfig};
use sheetwise::config::Settings;
use sheetwise::logging;

#[derive(Parser, Debug)]
#[command(name = "sheetwise-server")]
#[command(version)]
#[command(about = "Sheetwise API Server - HTTP REST API for spreadsheet transformations")]
#[command(long_about = r#"
Sheetwise API Server

Provides RESTful endpoints:
  - POST /api/v1/sheets       - List worksheets of a workbook
  - POST /api/v1/columns      - Headers and letters of a worksheet
  - POST /api/v1/column-type  - Check whether a column is numeric
  - POST /api/v1/vlookup      - Composite-key lookup between two sheets
  - POST /api/v1/pivot        - Pivot aggregation with styled output
  - POST /api/v1/concatenate  - Join columns into a new column

Additional endpoints:
  - GET  /health              - Health check
  - GET  /version             - Server version info
  - GET  /                    - API documentation

Example usage:
  sheetwise-server                           # Start on localhost:8080
  sheetwise-server --host 0.0.0.0 --port 3000 --config sheetwise.yaml

  curl -X POST http://localhost:8080/api/v1/pivot \
    -H "Content-Type: application/json" \
    -d '{"file": "uploads/sales.xlsx", "rows": ["A"], "values": [{"column": "C", "aggfunc": "sum"}]}'
"#)]
struct Args {
    /// Host address to bind to (use 0.0.0.0 for all interfaces)
    #[arg(short = 'H', long, default_value = "127.0.0.1", env = "SHEETWISE_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "SHEETWISE_PORT")]
    port: u16,

    /// YAML settings file
    #[arg(short, long, env = "SHEETWISE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init("sheetwise=info,tower_http=info");

    let config = ApiConfig {
        host: args.host,
        port: args.port,
        settings: Settings::load_or_default(args.config.as_deref())?,
    };

    run_api_server(config).await
}
