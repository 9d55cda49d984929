use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use imgur_photo_uploader::config::{self, Config};
use imgur_photo_uploader::image_processor;
use imgur_photo_uploader::manifest::Manifest;
use imgur_photo_uploader::uploader::{ImgurClient, RetryConfig, Uploader};

#[derive(Parser)]
#[command(name = "imgur-photo-uploader", version, about = "Convert, renumber and upload photo folders")]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Upload every new image under DIR to Imgur
    Upload {
        dir: Option<PathBuf>,
        #[arg(long, env = "IMGUR_CLIENT_ID", hide_env_values = true)]
        client_id: Option<String>,
        #[arg(long)]
        manifest: Option<PathBuf>,
    },
    /// Convert JPEG/PNG files to numbered WebP files, deleting the originals
    Convert {
        #[arg(default_value = ".")]
        dir: PathBuf,
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
        quality: Option<u8>,
    },
    /// Rename existing WebP files to 1.webp, 2.webp, ... per folder
    Renumber {
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .init();

    let config = config::load_config(cli.config.as_deref()).context("loading configuration")?;

    match cli.cmd {
        Cmd::Upload {
            dir,
            client_id,
            manifest,
        } => upload(config, dir, client_id, manifest),
        Cmd::Convert { dir, quality } => convert(&config, dir, quality),
        Cmd::Renumber { dir } => renumber(dir),
    }
}

fn upload(
    mut config: Config,
    dir: Option<PathBuf>,
    client_id: Option<String>,
    manifest_path: Option<PathBuf>,
) -> Result<()> {
    if let Some(client_id) = client_id {
        config.client_id = client_id;
    }
    if let Some(manifest_path) = manifest_path {
        config.manifest_path = manifest_path;
    }
    let root = dir.unwrap_or_else(|| config.target_directory.clone());
    let client_id = config::require_client_id(&config)?;

    log::info!("Starting upload of {}", root.display());

    let mut manifest = Manifest::load(&config.manifest_path)
        .with_context(|| format!("loading manifest {}", config.manifest_path.display()))?;
    let client = ImgurClient::from_config(&config, client_id)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let summary = runtime.block_on(async {
        let mut uploader = Uploader::new(client, &mut manifest, RetryConfig::from(&config));
        uploader.process_directory(&root).await
    })?;

    println!();
    println!("{}", summary);
    if summary.has_errors() {
        log::warn!("{} file(s) were not uploaded; rerun to retry them", summary.errors);
    }
    Ok(())
}

fn convert(config: &Config, dir: PathBuf, quality: Option<u8>) -> Result<()> {
    let quality = quality.unwrap_or(config.webp_quality);

    println!("📂 Root: {}", dir.display());
    println!("⚠️  WARNING: files are renamed (1.webp, 2.webp...) and originals deleted.");
    println!("------------------------------------------------");

    let report = image_processor::convert_directory_tree(&dir, quality)?;

    println!("------------------------------------------------");
    println!(
        "🎉 Done! {} converted, {} failed in {} folders.",
        report.converted, report.failed, report.directories
    );
    Ok(())
}

fn renumber(dir: PathBuf) -> Result<()> {
    println!("📂 Root: {}", dir.display());
    println!("🔄 Renaming existing .webp files to 1.webp, 2.webp...");
    println!("------------------------------------------------");

    let report = image_processor::renumber_directory_tree(&dir)?;

    println!("------------------------------------------------");
    println!(
        "🎉 Done! {} renamed, {} failed in {} folders.",
        report.renamed, report.failed, report.directories
    );
    Ok(())
}
