use clap::Parser;
use metadata_ingest::utils::logger;
use metadata_ingest::{default_sequence, CliArgs, EtlError, IngestConfig, JobParams};

fn load_params(args: &CliArgs) -> Result<JobParams, EtlError> {
    let env = IngestConfig::from_env()?;
    let config = match &args.config {
        Some(path) => {
            tracing::info!("📄 Loading settings from {}", path.display());
            IngestConfig::from_file(path)?.or(env)
        }
        None => env,
    };
    config.into_params()
}

fn fail(e: &EtlError) -> ! {
    tracing::error!("❌ Ingestion failed: {}", e);
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e);
    eprintln!("💡 建議: {}", e.recovery_suggestion());
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    // 初始化日誌
    if args.log_json {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("Starting metadata-ingest");
    if args.verbose {
        tracing::debug!("CLI args: {:?}", args);
    }

    let params = match load_params(&args) {
        Ok(params) => params,
        Err(e) => fail(&e),
    };
    tracing::info!("🏷️ Publish tag: {}", params.publish_tag);

    let sequence = default_sequence(&params);

    if args.dry_run {
        match sequence.describe_all() {
            Ok(described) => {
                for (name, entries) in described {
                    println!("# {}", name);
                    println!("{}", entries);
                }
                return;
            }
            Err(e) => fail(&e),
        }
    }

    match sequence.execute_all().await {
        Ok(outcomes) => {
            let total: std::time::Duration = outcomes.iter().map(|o| o.report.duration).sum();
            tracing::info!(
                "✅ {} job(s) completed successfully in {:?}",
                outcomes.len(),
                total
            );
            println!("✅ Metadata ingestion completed successfully!");
        }
        Err(e) => fail(&e),
    }
}
