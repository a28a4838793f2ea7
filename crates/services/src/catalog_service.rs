use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::Deserialize;

use drill_core::model::{Catalog, User, WordPair};

use crate::error::CatalogError;

const PROMPT_COLUMN: &str = "prompt";
const ANSWER_COLUMN: &str = "answer";

/// Outcome of merging an uploaded batch into the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendReport {
    pub added: usize,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
struct CatalogRow {
    prompt: String,
    answer: String,
}

/// Owns the word list and its CSV source file.
///
/// The catalog is read once at startup; appends rewrite the file and swap the
/// in-memory snapshot.
pub struct CatalogService {
    path: PathBuf,
    catalog: RwLock<Arc<Catalog>>,
}

impl CatalogService {
    /// Load the catalog from `path`, falling back to the built-in pair if the
    /// file is missing, malformed or empty.
    #[must_use]
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let catalog = match File::open(&path)
            .map_err(CatalogError::from)
            .and_then(|file| parse_catalog(file, false))
        {
            Ok(catalog) if !catalog.is_empty() => {
                tracing::info!(path = %path.display(), words = catalog.len(), "loaded word list");
                catalog
            }
            Ok(_) => {
                tracing::warn!(path = %path.display(), "word list is empty; using built-in word");
                Catalog::fallback()
            }
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "could not load word list; using built-in word");
                Catalog::fallback()
            }
        };
        Self::with_catalog(path, catalog)
    }

    #[must_use]
    pub fn with_catalog(path: impl Into<PathBuf>, catalog: Catalog) -> Self {
        Self {
            path: path.into(),
            catalog: RwLock::new(Arc::new(catalog)),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the current catalog.
    #[must_use]
    pub fn current(&self) -> Arc<Catalog> {
        match self.catalog.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    /// Merge an uploaded CSV batch into the catalog and rewrite the source file.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Forbidden` unless `actor` is an admin,
    /// `CatalogError::MissingColumns`/`InvalidRow`/`Csv` for a bad batch, and
    /// `CatalogError::Io`/`Persist` if the file cannot be rewritten.
    pub fn append_from_reader<R: Read>(
        &self,
        actor: &User,
        batch: R,
    ) -> Result<AppendReport, CatalogError> {
        if !actor.role().can_edit_catalog() {
            return Err(CatalogError::Forbidden);
        }
        let batch = parse_catalog(batch, true)?;

        let mut merged = (*self.current()).clone();
        let added = merged.merge(batch.words().iter().cloned());
        write_catalog(&self.path, &merged)?;

        let total = merged.len();
        match self.catalog.write() {
            Ok(mut guard) => *guard = Arc::new(merged),
            Err(poisoned) => *poisoned.into_inner() = Arc::new(merged),
        }
        tracing::info!(user = %actor.id(), added, total, "merged words into word list");
        Ok(AppendReport { added, total })
    }

    /// Same as [`append_from_reader`](Self::append_from_reader), reading from a file.
    ///
    /// # Errors
    ///
    /// See `append_from_reader`; also fails with `CatalogError::Io` if the
    /// upload cannot be opened.
    pub fn append_from_path(
        &self,
        actor: &User,
        upload: impl AsRef<Path>,
    ) -> Result<AppendReport, CatalogError> {
        let file = File::open(upload)?;
        self.append_from_reader(actor, file)
    }
}

/// Parse a `prompt,answer` CSV. With `strict`, invalid rows are errors;
/// otherwise they are logged and skipped.
fn parse_catalog<R: Read>(reader: R, strict: bool) -> Result<Catalog, CatalogError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let has = |name: &str| headers.iter().any(|h| h == name);
    if !has(PROMPT_COLUMN) || !has(ANSWER_COLUMN) {
        return Err(CatalogError::MissingColumns {
            found: headers.iter().collect::<Vec<_>>().join(", "),
        });
    }

    let mut words = Vec::new();
    for (idx, result) in rdr.deserialize::<CatalogRow>().enumerate() {
        let row = result?;
        match WordPair::new(&row.prompt, &row.answer) {
            Ok(pair) => words.push(pair),
            Err(source) => {
                // Line 1 is the header.
                let line = u64::try_from(idx).unwrap_or(u64::MAX).saturating_add(2);
                if strict {
                    return Err(CatalogError::InvalidRow { line, source });
                }
                tracing::warn!(line, error = %source, "skipping invalid word");
            }
        }
    }
    Ok(Catalog::new(words))
}

/// Write the catalog next to `path` and atomically replace it.
fn write_catalog(path: &Path, catalog: &Catalog) -> Result<(), CatalogError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let tmp = tempfile::NamedTempFile::new_in(&dir)?;
    {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(tmp.as_file());
        wtr.write_record([PROMPT_COLUMN, ANSWER_COLUMN])?;
        for pair in catalog.words() {
            wtr.serialize(pair)?;
        }
        wtr.flush()?;
    }
    tmp.persist(path)?;
    Ok(())
}
