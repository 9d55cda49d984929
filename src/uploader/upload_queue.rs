use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::Path;
use tokio::time::sleep;

use crate::errors::{AppError, AppResult};
use crate::manifest::{manifest_key, Manifest, ManifestEntry};
use crate::walker;

use super::imgur_client::{ImageHost, UploadedImage};
use super::progress_tracker::{UploadOutcome, UploadSummary};
use super::retry::RetryConfig;

/// Sequential uploader over a single manifest.
pub struct Uploader<'a, H: ImageHost> {
    host: H,
    manifest: &'a mut Manifest,
    retry: RetryConfig,
}

impl<'a, H: ImageHost> Uploader<'a, H> {
    pub fn new(host: H, manifest: &'a mut Manifest, retry: RetryConfig) -> Self {
        Self {
            host,
            manifest,
            retry,
        }
    }

    /// The host uploads go to; lets callers inspect a test double after a run.
    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn manifest(&self) -> &Manifest {
        &*self.manifest
    }

    /// Upload every image below `root` that is not yet in the manifest.
    ///
    /// Per-file failures are logged and counted; only a missing root aborts.
    pub async fn process_directory(&mut self, root: &Path) -> AppResult<UploadSummary> {
        if !root.is_dir() {
            return Err(AppError::directory_not_found(root));
        }

        println!("🔍 Scanning {}...", root.display());
        let mut summary = UploadSummary::default();

        for filepath in walker::image_files(root) {
            let outcome = match self.upload_one(&filepath).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    log::error!("Upload of {} not recorded: {}", filepath.display(), e);
                    println!("✗ {}: {}", display_name(&filepath), e);
                    UploadOutcome::Failed
                }
            };
            summary.record(outcome);
        }

        log::info!(
            "Scan of {} finished: {} uploaded, {} skipped, {} failed",
            root.display(),
            summary.uploaded,
            summary.skipped,
            summary.errors
        );
        Ok(summary)
    }

    /// Upload one file unless the manifest already has it.
    ///
    /// Returns `Err` only when the upload went through but the manifest could
    /// not be written; every other failure ends as [`UploadOutcome::Failed`].
    pub async fn upload_one(&mut self, filepath: &Path) -> AppResult<UploadOutcome> {
        let original_name = display_name(filepath);

        if self.manifest.is_already_uploaded(filepath) {
            println!("✓ Already uploaded: {}", original_name);
            return Ok(UploadOutcome::Skipped);
        }

        let remote_name = random_remote_name(filepath);
        let mut attempts = 0;
        let mut rate_limit_waits = 0;

        while self.retry.has_attempts_left(attempts) {
            match self.attempt_upload(filepath).await {
                Ok(image) => {
                    let entry = build_entry(filepath, &original_name, remote_name, &image);
                    self.manifest.record_upload(entry)?;

                    println!("✓ Uploaded: {}", original_name);
                    println!("   Link: {}", image.link);
                    return Ok(UploadOutcome::Uploaded);
                }
                Err(AppError::RateLimit { retry_after_secs }) => {
                    rate_limit_waits += 1;
                    if !self.retry.allows_rate_limit_wait(rate_limit_waits) {
                        log::error!(
                            "Giving up on {} after {} rate-limited responses",
                            original_name,
                            rate_limit_waits
                        );
                        println!("✗ Still rate limited, giving up on {}", original_name);
                        return Ok(UploadOutcome::Failed);
                    }

                    let wait = self.retry.rate_limit_delay(retry_after_secs);
                    println!("⚠ Too many requests. Waiting {} seconds...", wait.as_secs());
                    sleep(wait).await;
                    continue;
                }
                Err(e) => {
                    log::warn!(
                        "Attempt {}/{} for {} failed: {}",
                        attempts + 1,
                        self.retry.max_retries,
                        filepath.display(),
                        e
                    );
                    println!("✗ Upload failed for {}: {}", original_name, e);
                    if !e.is_retryable() {
                        return Ok(UploadOutcome::Failed);
                    }
                }
            }

            attempts += 1;
            if self.retry.has_attempts_left(attempts) {
                println!(
                    "↻ Retrying in {} seconds...",
                    self.retry.retry_delay.as_secs()
                );
                sleep(self.retry.retry_delay).await;
            }
        }

        Ok(UploadOutcome::Failed)
    }

    async fn attempt_upload(&self, filepath: &Path) -> AppResult<UploadedImage> {
        let contents = tokio::fs::read(filepath).await?;
        let encoded = STANDARD.encode(contents);
        self.host.upload(&encoded).await
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}

/// Name for the remote copy: a v4 UUID in hex plus the local suffix.
pub fn random_remote_name(path: &Path) -> String {
    let suffix = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    format!("{}{}", uuid::Uuid::new_v4().simple(), suffix)
}

fn build_entry(
    filepath: &Path,
    original_name: &str,
    remote_name: String,
    image: &UploadedImage,
) -> ManifestEntry {
    ManifestEntry {
        filename: remote_name,
        original_name: original_name.to_string(),
        remote_link: image.link.clone(),
        delete_handle: image.deletehash.clone(),
        remote_id: image.id.clone(),
        upload_timestamp: chrono::Local::now()
            .format("%Y-%m-%dT%H:%M:%S%.6f")
            .to_string(),
        filepath: manifest_key(filepath),
    }
}
