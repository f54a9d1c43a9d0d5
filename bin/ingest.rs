use clap::{Arg, ArgAction, Command};
use course_ingest::logging::{init_logging, LogFormat};
use course_ingest::{process_csv_stream, reader_from_path, IngestOptions, ValidationMode};
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

/// Run the upload pipeline over a local file and print what the endpoint would answer.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = Command::new("ingest")
        .arg(
            Arg::new("path")
                .long("path")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("strict-rows")
                .long("strict-rows")
                .help("Check required columns on every row")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .help("Print only the summary line, not the rows")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    init_logging(LogFormat::from_env());

    let path = matches
        .get_one::<PathBuf>("path")
        .ok_or_else(|| anyhow::anyhow!("Provide --path <file>"))?;
    let options = IngestOptions {
        validation: if matches.get_flag("strict-rows") {
            ValidationMode::EveryRow
        } else {
            ValidationMode::FirstRow
        },
    };

    let start = Instant::now();
    let (reader, meta) = reader_from_path(path).await?;
    let outcome = process_csv_stream(reader, &options).await;
    let elapsed = start.elapsed().as_secs_f64();

    let mut out = std::io::stdout().lock();
    match outcome {
        Ok(rows) => {
            if !matches.get_flag("quiet") {
                serde_json::to_writer_pretty(&mut out, &rows)?;
                writeln!(out)?;
            }
            let rps = (rows.len() as f64) / elapsed.max(f64::EPSILON);
            eprintln!(
                "source={} content_type={} rows={}\nelapsed={:.3}s rows/sec={:.0}",
                path.display(),
                meta.content_type,
                rows.len(),
                elapsed,
                rps
            );
            Ok(())
        }
        Err(e) => {
            serde_json::to_writer(&mut out, &serde_json::json!({ "message": e.to_string() }))?;
            writeln!(out)?;
            anyhow::bail!("{} rejected ({})", path.display(), e.status())
        }
    }
}
