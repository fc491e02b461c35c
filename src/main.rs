// src/main.rs

use tierflow::plan::PlanStatus;
use tierflow::{cli, logging, run};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(PlanStatus::Failed) => std::process::exit(1),
        Ok(_) => {}
        Err(err) => {
            eprintln!("tierflow error: {err:?}");
            std::process::exit(1);
        }
    }
}

async fn run_main() -> anyhow::Result<PlanStatus> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}
