use anyhow::Context;
use api_shared::{
    CleanupRes, FileInfoRes, ReferenceValidationRes, RepairRes, StorageStatsRes, UploadRes,
};
use clap::{Parser, Subcommand};
use media_core::{
    format_bytes, load_config, uploaded_at, MediaService, OutputFormat, UploadFile,
    UploadOptions,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "media")]
#[command(about = "Media asset storage and maintenance CLI")]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate, transcode and store an image
    Upload {
        /// Image file to upload
        file: PathBuf,
        /// Category subdirectory (banks, sponsors, schools, gallery, alerts)
        #[arg(long)]
        subdirectory: String,
        /// Filename prefix (defaults to the subdirectory)
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
        /// Output format: webp, jpeg or png
        #[arg(long)]
        format: Option<OutputFormat>,
        /// Encoder quality, 1-100
        #[arg(long)]
        quality: Option<u8>,
    },
    /// Show metadata for a stored file
    Info {
        /// Path relative to the upload root
        path: String,
    },
    /// Delete a stored file
    Delete {
        /// Path relative to the upload root
        path: String,
    },
    /// Show storage statistics over referenced files
    Stats,
    /// Report valid and broken references per collaborator
    Check,
    /// List orphaned files without deleting them
    Orphans,
    /// Delete orphaned files
    Cleanup,
    /// Clear references that point at missing files
    Repair,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("media_core=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("Use 'media --help' for commands");
        return Ok(());
    };

    let cfg = load_config(|key| std::env::var(key).ok())?;
    let service = MediaService::from_config(cfg)?;

    match command {
        Commands::Upload {
            file,
            subdirectory,
            prefix,
            width,
            height,
            format,
            quality,
        } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let mime = infer::get(&bytes)
                .map(|kind| kind.mime_type())
                .unwrap_or("application/octet-stream");
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload".into());

            let options = UploadOptions {
                prefix: prefix.unwrap_or_else(|| subdirectory.clone()),
                subdirectory,
                width,
                height,
                format,
                quality,
            };
            let upload = UploadFile::new(filename, mime, bytes);
            let asset = service.process_upload(Some(&upload), &options)?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&UploadRes::from(asset))?);
            } else {
                println!("Stored {} ({}x{})", asset.relative_path, asset.width, asset.height);
                println!(
                    "Size: {} -> {}",
                    format_bytes(asset.original_byte_size),
                    format_bytes(asset.byte_size)
                );
                println!("URL: {}", asset.url);
            }
        }
        Commands::Info { path } => match service.get_asset_info(&path) {
            Some(info) if cli.json => {
                println!("{}", serde_json::to_string_pretty(&FileInfoRes::from(info))?)
            }
            Some(info) => {
                println!("Path: {}", info.relative_path);
                println!("Size: {}", format_bytes(info.size_bytes));
                if let (Some(w), Some(h)) = (info.width, info.height) {
                    println!("Dimensions: {}x{}", w, h);
                }
                if let Some(media_type) = &info.media_type {
                    println!("Type: {}", media_type);
                }
                if let Some(at) = uploaded_at(info.relative_path.as_str()) {
                    println!("Uploaded: {}", at.to_rfc3339());
                }
                println!("Created: {}", info.created_at.to_rfc3339());
                println!("Modified: {}", info.modified_at.to_rfc3339());
            }
            None => anyhow::bail!("No such file: {}", path),
        },
        Commands::Delete { path } => {
            if service.delete_asset(&path) {
                println!("Deleted {}", path);
            } else {
                println!("Nothing deleted: {} is missing or not removable", path);
            }
        }
        Commands::Stats => {
            let stats = service.get_storage_stats();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&StorageStatsRes::from(stats))?);
            } else {
                println!("Images: {}", stats.total_images);
                println!("Total size: {}", stats.total_size_formatted);
                println!("Average size: {}", format_bytes(stats.average_size));
            }
        }
        Commands::Check => {
            let validation = service.validate_references()?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&ReferenceValidationRes::from(validation))?
                );
            } else {
                for report in &validation.per_collaborator {
                    match &report.error {
                        Some(error) => println!("{}: query failed: {}", report.collaborator, error),
                        None => println!(
                            "{}: {} valid, {} broken, {} external",
                            report.collaborator,
                            report.valid.len(),
                            report.broken.len(),
                            report.external_count
                        ),
                    }
                    for broken in &report.broken {
                        println!("  broken: {} ({}) -> {}", broken.label, broken.record_id, broken.path);
                    }
                }
                println!("Orphaned files: {}", validation.orphaned.len());
            }
        }
        Commands::Orphans => {
            let orphans = service.list_orphans()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&orphans)?);
            } else if orphans.is_empty() {
                println!("No orphaned files.");
            } else {
                for path in orphans {
                    println!("{}", path);
                }
            }
        }
        Commands::Cleanup => {
            let summary = service.cleanup_orphans()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&CleanupRes::from(summary))?);
            } else {
                println!(
                    "Deleted {} orphaned files ({} failed, {} too recent); {} referenced paths",
                    summary.deleted_count,
                    summary.failed_count,
                    summary.skipped_recent_count,
                    summary.valid_paths_count
                );
                if !summary.failed_collaborators.is_empty() {
                    eprintln!(
                        "Warning: collaborators failed during the scan: {}",
                        summary.failed_collaborators.join(", ")
                    );
                }
            }
        }
        Commands::Repair => {
            let summary = service.fix_broken_references();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&RepairRes::from(summary))?);
            } else {
                println!(
                    "Cleared {} of {} broken references ({} failed)",
                    summary.fixed_count, summary.orphaned_count, summary.failed_count
                );
            }
        }
    }

    Ok(())
}
