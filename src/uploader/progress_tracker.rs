use std::fmt;

/// Result of handing one file to the uploader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded,
    /// Already present in the manifest
    Skipped,
    Failed,
}

/// Running counts for a directory scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadSummary {
    pub total: usize,
    pub uploaded: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl UploadSummary {
    pub fn record(&mut self, outcome: UploadOutcome) {
        self.total += 1;
        match outcome {
            UploadOutcome::Uploaded => self.uploaded += 1,
            UploadOutcome::Skipped => self.skipped += 1,
            UploadOutcome::Failed => self.errors += 1,
        }
        log::debug!(
            "Progress: {} scanned, {} uploaded, {} skipped, {} failed",
            self.total,
            self.uploaded,
            self.skipped,
            self.errors
        );
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }
}

impl fmt::Display for UploadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "📊 Summary:")?;
        writeln!(f, "- Files found: {}", self.total)?;
        writeln!(f, "- New uploads: {}", self.uploaded)?;
        writeln!(f, "- Already uploaded: {}", self.skipped)?;
        write!(f, "- Failures: {}", self.errors)
    }
}
