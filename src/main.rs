//! db-reports - interactive parameterized MySQL reports exported to CSV.

use db_reports::catalog::QueryCatalog;
use db_reports::cli::Cli;
use db_reports::config::ConnectionConfig;
use db_reports::error::Result;
use db_reports::secrets::{resolve_credentials, AwsSecretsManager};
use db_reports::session::{ReportSession, StdConsole};
use db_reports::{db, logging};
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();

    if cli.log_file {
        logging::init_file_logging();
    } else {
        logging::init_stderr_logging();
    }

    if let Err(e) = run(cli).await {
        error!("{}: {}", e.category(), e);
        eprintln!("{e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    info!("Loading query catalog from: {}", cli.queries.display());
    let catalog = QueryCatalog::load_from_file(&cli.queries)?;

    let secrets = AwsSecretsManager::connect(&cli.aws_profile, cli.region.as_deref()).await;
    let credentials = resolve_credentials(&secrets, &cli.secret_name).await?;

    let connection = ConnectionConfig::from_credentials(&credentials);
    info!("Connecting to {}", connection.display_string());
    let client = db::connect(&connection).await?;

    let mut session = ReportSession::new(client, catalog, cli.export_settings());
    session.run(&mut StdConsole::new()).await
}
