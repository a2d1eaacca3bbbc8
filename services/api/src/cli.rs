use crate::demo::{run_bulk_preview, run_catalog, run_demo, BulkArgs, CatalogArgs, DemoArgs};
use crate::server;
use casecheck::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "Case Desk",
    about = "Run the background-verification case desk or exercise it from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print the normalized check catalog grouped by category
    Catalog(CatalogArgs),
    /// Validate a bulk candidate sheet and preview the links it would send
    Bulk(BulkArgs),
    /// Walk a case from creation through candidate upload, review and report
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Catalog(args) => run_catalog(args),
        Command::Bulk(args) => run_bulk_preview(args),
        Command::Demo(args) => run_demo(args),
    }
}
