use clap::{Arg, ArgAction, Command};
use course_ingest::config::ServerConfig;
use course_ingest::logging::{init_logging, LogFormat};
use course_ingest::ValidationMode;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let matches = Command::new("server")
        .about("Accepts course-registration CSV uploads and returns cleaned rows")
        .arg(
            Arg::new("bind")
                .long("bind")
                .help("Socket address, overrides BIND_ADDR/PORT")
                .value_parser(clap::value_parser!(SocketAddr)),
        )
        .arg(
            Arg::new("upload-dir")
                .long("upload-dir")
                .help("Temp directory for request bodies")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("max-upload-bytes")
                .long("max-upload-bytes")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("strict-rows")
                .long("strict-rows")
                .help("Check required columns on every row")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Log JSON lines, same as LOG_FORMAT=json")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let format = if matches.get_flag("json-logs") {
        LogFormat::Json
    } else {
        LogFormat::from_env()
    };
    init_logging(format);

    let mut config = ServerConfig::from_env()?;
    if let Some(bind) = matches.get_one::<SocketAddr>("bind") {
        config.bind = *bind;
    }
    if let Some(dir) = matches.get_one::<PathBuf>("upload-dir") {
        config.upload_dir = dir.clone();
    }
    if let Some(max) = matches.get_one::<usize>("max-upload-bytes") {
        config.max_upload_bytes = Some(*max);
    }
    if matches.get_flag("strict-rows") {
        config.ingest.validation = ValidationMode::EveryRow;
    }

    course_ingest::server::serve(config, shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(e) => warn!(error = %e, "could not listen for ctrl-c; shutting down"),
    }
}
