#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for `s3_push`.
//!
//! Uploads one file to S3 under a key equal to its path, skipping the
//! transfer when an object of the same size and checksum is already there.
//!
//! Uses `indicatif-log-bridge` (via [`s3_push_cli_utils::init_logger`])
//! so log lines and the upload progress bar never fight for the terminal.

use std::path::PathBuf;

use clap::Parser;
use s3_push::store::S3Store;
use s3_push::UploadDecider;
use s3_push_cli_utils::IndicatifProgress;

/// Bucket used when `--bucket` is not given.
const DEFAULT_BUCKET: &str = "cloudlabs.blobs.us-west-2";

/// Region the S3 session always uses.
const REGION: &str = "us-west-2";

#[derive(Parser)]
#[command(
    name = "s3_push",
    about = "Upload a file to S3 unless an identical object is already there"
)]
struct Cli {
    /// Local file to upload; also used verbatim as the object key
    path: PathBuf,
    /// Destination bucket
    #[arg(long, default_value = DEFAULT_BUCKET)]
    bucket: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = s3_push_cli_utils::init_logger();
    let cli = Cli::parse();

    log::info!("{} {}", cli.bucket, cli.path.display());

    // Fail before touching the network if the file can't be read.
    s3_push::run::ensure_readable(&cli.path)?;

    let store = match S3Store::connect(REGION).await {
        Ok(store) => store,
        Err(e) => {
            log::error!("{e}");
            log::error!(
                "Configure credentials via AWS_ACCESS_KEY_ID/AWS_SECRET_ACCESS_KEY or AWS_PROFILE"
            );
            return Err(e.into());
        }
    };
    let decider = UploadDecider::new(store);

    let progress = IndicatifProgress::bytes_bar(&multi, &cli.path.display().to_string());
    // A failed upload is logged by `run` and still exits 0.
    s3_push::run(&decider, &cli.path, &cli.bucket, progress).await?;
    Ok(())
}
