use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{AppError, AppResult};
use crate::walker::{self, CONVERTIBLE_EXTENSIONS};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionReport {
    /// Directories that held at least one convertible image
    pub directories: usize,
    pub converted: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenumberReport {
    /// Directories that held at least one WebP file
    pub directories: usize,
    pub renamed: usize,
    pub failed: usize,
}

pub fn validate_quality(quality: u8) -> AppResult<()> {
    if quality == 0 || quality > 100 {
        return Err(AppError::validation(
            "quality",
            "Quality must be between 1 and 100",
        ));
    }
    Ok(())
}

/// Encode `source` as lossy WebP at `quality` and write it to `destination`.
pub fn convert_to_webp(source: &Path, destination: &Path, quality: u8) -> AppResult<()> {
    validate_quality(quality)?;

    let img = image::open(source)?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let encoded = webp::Encoder::from_rgba(rgba.as_raw(), width, height)
        .encode_simple(false, quality as f32)
        .map_err(|e| AppError::Encoding(format!("{:?}", e)))?;

    fs::write(destination, &*encoded)?;

    log::debug!(
        "Converted {} to {} ({}x{}, quality: {})",
        source.display(),
        destination.display(),
        width,
        height,
        quality
    );
    Ok(())
}

/// Convert every JPEG/PNG under `root` to `1.webp`, `2.webp`, ... per
/// directory, in name order, deleting each original once its WebP is written.
///
/// The counter only advances on success, so a failed file does not leave a
/// gap. Existing files with the target names are overwritten.
pub fn convert_directory_tree(root: &Path, quality: u8) -> AppResult<ConversionReport> {
    validate_quality(quality)?;
    if !root.is_dir() {
        return Err(AppError::directory_not_found(root));
    }

    let mut report = ConversionReport::default();

    for dir in walker::directories(root) {
        let images = match walker::files_in_directory(&dir, CONVERTIBLE_EXTENSIONS) {
            Ok(images) => images,
            Err(e) => {
                log::warn!("Cannot list {}: {}", dir.display(), e);
                continue;
            }
        };
        if images.is_empty() {
            continue;
        }

        report.directories += 1;
        println!("   Processing folder: {}", relative_display(&dir, root));

        let mut counter = 1;
        for original in &images {
            let target = dir.join(format!("{}.webp", counter));
            let result = convert_to_webp(original, &target, quality)
                .and_then(|_| fs::remove_file(original).map_err(AppError::from));

            match result {
                Ok(()) => {
                    counter += 1;
                    report.converted += 1;
                }
                Err(e) => {
                    report.failed += 1;
                    log::error!("Conversion failed for {}: {}", original.display(), e);
                    println!("❌ Error on {}: {}", file_name(original), e);
                }
            }
        }

        println!("   ✅ {} images converted and renamed.", counter - 1);
    }

    log::info!(
        "WebP conversion under {} done: {} converted, {} failed",
        root.display(),
        report.converted,
        report.failed
    );
    Ok(report)
}

/// Rename the `.webp` files of every directory under `root` to `1.webp`,
/// `2.webp`, ... in name order.
///
/// Files are first moved to temporary names so a target that already exists
/// (say, an earlier `1.webp`) is never clobbered mid-way.
pub fn renumber_directory_tree(root: &Path) -> AppResult<RenumberReport> {
    if !root.is_dir() {
        return Err(AppError::directory_not_found(root));
    }

    let mut report = RenumberReport::default();

    for dir in walker::directories(root) {
        let webp_files = match walker::files_in_directory(&dir, &["webp"]) {
            Ok(files) => files,
            Err(e) => {
                log::warn!("Cannot list {}: {}", dir.display(), e);
                continue;
            }
        };
        if webp_files.is_empty() {
            continue;
        }

        report.directories += 1;
        println!(
            "   Folder: {} ({} images)",
            relative_display(&dir, root),
            webp_files.len()
        );

        let mut staged: Vec<PathBuf> = Vec::with_capacity(webp_files.len());
        for (index, file) in webp_files.iter().enumerate() {
            let temp = dir.join(format!("__temp_rename_{}__.tmp", index + 1));
            match fs::rename(file, &temp) {
                Ok(()) => staged.push(temp),
                Err(e) => {
                    report.failed += 1;
                    log::error!("Temporary rename failed for {}: {}", file.display(), e);
                    println!("❌ Error staging {}: {}", file_name(file), e);
                }
            }
        }

        for (index, temp) in staged.iter().enumerate() {
            let target = dir.join(format!("{}.webp", index + 1));
            match fs::rename(temp, &target) {
                Ok(()) => report.renamed += 1,
                Err(e) => {
                    report.failed += 1;
                    log::error!("Final rename to {} failed: {}", target.display(), e);
                    println!("❌ Error on {}.webp: {}", index + 1, e);
                }
            }
        }
    }

    log::info!(
        "Renumbering under {} done: {} renamed, {} failed",
        root.display(),
        report.renamed,
        report.failed
    );
    Ok(report)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}

fn relative_display(dir: &Path, root: &Path) -> String {
    match dir.strip_prefix(root) {
        Ok(relative) if relative.as_os_str().is_empty() => ".".to_string(),
        Ok(relative) => relative.display().to_string(),
        Err(_) => dir.display().to_string(),
    }
}
