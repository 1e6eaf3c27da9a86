use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::DOCUMENT_EXT;
use crate::db::Sink;
use crate::error::{AppError, Result};
use crate::ids::IdAllocator;
use crate::importer::TreeImporter;
use crate::types::ImportStats;

/// Full-refresh loader: wipes the four tables, then replays every document
/// found directly in the data directory through the tree importer.
///
/// Owns the id allocator, so synthetic ids stay monotonic across cycles for
/// the lifetime of the process.
pub struct BatchLoader {
    sink: Sink,
    ids: IdAllocator,
    data_dir: PathBuf,
}

impl BatchLoader {
    pub fn new(sink: Sink, ids: IdAllocator, data_dir: PathBuf) -> Self {
        Self { sink, ids, data_dir }
    }

    pub fn sink(&self) -> &Sink {
        &self.sink
    }

    /// Wipe + reload. The wipe is all-or-nothing; the reload is best-effort
    /// per file. A missing data directory aborts before anything is wiped.
    pub async fn import_all(&mut self) -> Result<ImportStats> {
        info!("Starting import of all documents from {}", self.data_dir.display());

        if !self.data_dir.is_dir() {
            return Err(AppError::DataDirMissing(
                self.data_dir.display().to_string(),
            ));
        }

        let files = self.discover_documents()?;

        self.sink.wipe_all().await?;
        info!("All tables cleared, {} documents to import", files.len());

        let mut stats = ImportStats::default();
        for path in &files {
            match TreeImporter::new(&self.sink, &mut self.ids).import_file(path).await {
                Ok(file_stats) => stats.absorb(file_stats),
                Err(e) => {
                    warn!("Skipping document {}: {e}", path.display());
                    stats.files_skipped += 1;
                }
            }
        }

        info!(
            files = stats.files,
            skipped = stats.files_skipped,
            sports = stats.sports,
            championships = stats.championships,
            matches = stats.matches,
            events = stats.events,
            row_failures = stats.row_failures,
            "Batch import finished",
        );
        Ok(stats)
    }

    /// Non-recursive scan for recognized documents. Listing order is whatever
    /// the directory yields — files are independent, one sport each.
    fn discover_documents(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.data_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() && has_document_ext(&path) {
                files.push(path);
            }
        }
        Ok(files)
    }
}

fn has_document_ext(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(DOCUMENT_EXT))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
