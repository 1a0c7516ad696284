use std::{fs, io, path::PathBuf};

use clap::{Parser, Subcommand};
use fincalc::api::{Tool, run_http_server, run_tool};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "fincalc",
    about = "Personal finance calculators: income tax, loans, retirement and education savings"
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the calculators as a JSON API over HTTP
    Serve {
        #[arg(long, env = "FINCALC_HOST", default_value = "0.0.0.0")]
        host: String,
        #[arg(long, env = "FINCALC_PORT", default_value_t = 8080)]
        port: u16,
    },
    /// Evaluate one calculator and print its JSON response
    Run {
        #[arg(value_enum)]
        tool: Tool,
        #[arg(
            long,
            help = "JSON payload file; reads stdin when omitted, empty input uses defaults"
        )]
        input: Option<PathBuf>,
    },
}

fn read_payload(input: Option<&PathBuf>) -> Result<String, String> {
    match input {
        Some(path) => fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {e}", path.display())),
        None => io::read_to_string(io::stdin()).map_err(|e| format!("Failed to read stdin: {e}")),
    }
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    match args.command {
        Command::Serve { host, port } => {
            if let Err(e) = run_http_server(&host, port).await {
                eprintln!("Server error: {e}");
                std::process::exit(1);
            }
        }
        Command::Run { tool, input } => {
            match read_payload(input.as_ref()).and_then(|json| run_tool(tool, &json)) {
                Ok(output) => println!("{output}"),
                Err(e) => {
                    eprintln!("Error: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}
