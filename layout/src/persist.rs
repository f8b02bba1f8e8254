//! Versioned draft format and draft stores.
//!
//! A draft is the document plus the minimal UI flags undo restores, encoded
//! as JSON:
//!
//! ```json
//! { "version": 1, "document": { ... }, "grid_snap": false }
//! ```
//!
//! Decoding is all-or-nothing. The version is checked before the body is
//! parsed, unknown fields are rejected, and a structural pass checks that the
//! document is internally consistent. A draft that fails any step never
//! reaches the editor.

#[cfg(test)]
#[path = "persist_test.rs"]
mod persist_test;

use std::cell::RefCell;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::consts::MIN_SIZE;
use crate::doc::Document;
use crate::editor::ErrorCode;

/// Current draft format version.
pub const FORMAT_VERSION: u32 = 1;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("malformed draft: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported draft version {found} (expected {expected})")]
    UnsupportedVersion { found: u64, expected: u32 },
    #[error("invalid draft: {0}")]
    Invalid(String),
    #[error("draft storage failed: {0}")]
    Io(#[from] io::Error),
}

impl ErrorCode for PersistError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Json(_) => "E_DRAFT_MALFORMED",
            Self::UnsupportedVersion { .. } => "E_DRAFT_VERSION",
            Self::Invalid(_) => "E_DRAFT_INVALID",
            Self::Io(_) => "E_DRAFT_IO",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

// =============================================================================
// CODEC
// =============================================================================

/// On-disk draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DraftFile {
    pub version: u32,
    pub document: Document,
    #[serde(default)]
    pub grid_snap: bool,
}

impl DraftFile {
    #[must_use]
    pub fn new(document: Document, grid_snap: bool) -> Self {
        Self { version: FORMAT_VERSION, document, grid_snap }
    }
}

#[derive(Deserialize)]
struct VersionProbe {
    version: Option<u64>,
}

/// Serialize a draft as pretty JSON.
///
/// # Errors
///
/// Returns `Json` if serialization fails.
pub fn encode(draft: &DraftFile) -> Result<String, PersistError> {
    Ok(serde_json::to_string_pretty(draft)?)
}

/// Parse and check a draft.
///
/// # Errors
///
/// Returns `UnsupportedVersion` for a missing or foreign version, `Json` for
/// malformed input or unknown fields, and `Invalid` when the document is not
/// internally consistent.
pub fn decode(text: &str) -> Result<DraftFile, PersistError> {
    let probe: VersionProbe = serde_json::from_str(text)?;
    match probe.version {
        Some(v) if v == u64::from(FORMAT_VERSION) => {}
        Some(found) => return Err(PersistError::UnsupportedVersion { found, expected: FORMAT_VERSION }),
        None => return Err(PersistError::Invalid("missing version".into())),
    }
    let draft: DraftFile = serde_json::from_str(text)?;
    check_structure(&draft.document)?;
    Ok(draft)
}

/// Structural consistency of a loaded document.
///
/// # Errors
///
/// Returns `Invalid` naming the first inconsistency found.
pub fn check_structure(doc: &Document) -> Result<(), PersistError> {
    let invalid = |msg: String| Err(PersistError::Invalid(msg));
    if !(doc.canvas_width > 0.0 && doc.canvas_height > 0.0) {
        return invalid(format!("canvas must be positive, got {}x{}", doc.canvas_width, doc.canvas_height));
    }
    let ordered: HashSet<_> = doc.layer_order().iter().collect();
    if ordered.len() != doc.layer_order().len() || ordered.len() != doc.layer_count() {
        return invalid("layer order does not list every layer exactly once".into());
    }
    for id in doc.layer_order() {
        if doc.layer(id).is_none() {
            return invalid(format!("layer order names unknown layer {id}"));
        }
    }
    let mut listed = 0;
    for layer in doc.layers() {
        for id in &layer.pieces {
            let Some(piece) = doc.piece(id) else {
                return invalid(format!("layer {} lists unknown piece {id}", layer.id));
            };
            if piece.layer != layer.id {
                return invalid(format!("piece {id} is listed on layer {} but assigned to {}", layer.id, piece.layer));
            }
        }
        let unique: HashSet<_> = layer.pieces.iter().collect();
        if unique.len() != layer.pieces.len() {
            return invalid(format!("layer {} lists a piece twice", layer.id));
        }
        listed += layer.pieces.len();
    }
    if listed != doc.len() {
        return invalid("some pieces are not listed by their layer".into());
    }
    for piece in doc.pieces() {
        if doc.material(&piece.material).is_none() {
            return invalid(format!("piece {} uses unknown material {}", piece.id, piece.material));
        }
        if piece.width < MIN_SIZE || piece.height < MIN_SIZE {
            return invalid(format!("piece {} is {}x{}, below the {MIN_SIZE} floor", piece.id, piece.width, piece.height));
        }
    }
    Ok(())
}

// =============================================================================
// STORES
// =============================================================================

/// Where drafts are autosaved and restored from.
pub trait DraftStore {
    /// The stored draft text, or `None` when nothing has been saved.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the store exists but cannot be read.
    fn load(&self) -> Result<Option<String>, PersistError>;

    /// Replace the stored draft.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the draft cannot be written.
    fn save(&self, text: &str) -> Result<(), PersistError>;
}

impl<T: DraftStore + ?Sized> DraftStore for Rc<T> {
    fn load(&self) -> Result<Option<String>, PersistError> {
        (**self).load()
    }

    fn save(&self, text: &str) -> Result<(), PersistError> {
        (**self).save(text)
    }
}

/// In-memory store, for tests and hosts without storage.
#[derive(Debug, Default)]
pub struct MemoryDraftStore {
    slot: RefCell<Option<String>>,
}

impl MemoryDraftStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `text`.
    #[must_use]
    pub fn with_text(text: impl Into<String>) -> Self {
        Self { slot: RefCell::new(Some(text.into())) }
    }

    /// Current contents.
    #[must_use]
    pub fn contents(&self) -> Option<String> {
        self.slot.borrow().clone()
    }
}

impl DraftStore for MemoryDraftStore {
    fn load(&self) -> Result<Option<String>, PersistError> {
        Ok(self.slot.borrow().clone())
    }

    fn save(&self, text: &str) -> Result<(), PersistError> {
        *self.slot.borrow_mut() = Some(text.to_owned());
        Ok(())
    }
}

/// Draft stored in a single JSON file.
#[derive(Debug, Clone)]
pub struct FileDraftStore {
    path: PathBuf,
}

impl FileDraftStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DraftStore for FileDraftStore {
    fn load(&self) -> Result<Option<String>, PersistError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, text: &str) -> Result<(), PersistError> {
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
