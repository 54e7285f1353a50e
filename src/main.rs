use anyhow::Result;
use tracing::{error, info};

use page_auditor::{cli, utils};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::parse_args();

    utils::init_logging(args.verbose, args.log_file.clone())?;

    info!("Starting Page Auditor v{}", env!("CARGO_PKG_VERSION"));

    match cli::process_command(args).await {
        Ok(_) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            Err(e)
        }
    }
}
