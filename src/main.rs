// main.rs
#[macro_use]
extern crate log;

use std::error::Error;

use structopt::StructOpt;

use pg_log_ingest::config::Config;
use pg_log_ingest::pipeline;

#[async_std::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let config = Config::from_args();
    debug!("{:?}", config);

    let summary = pipeline::run(config).await?;
    if summary.failed_archives > 0 {
        warn!(
            "{} archives could not be ingested, see errors above",
            summary.failed_archives
        );
    }

    Ok(())
}
