//! Directory-backed document store.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{SessionError, SessionResult};
use crate::session::{DocumentSession, DocumentStore};
use crate::shared::{write_document, DocumentCell, SharedSession};
use crate::xml::Document;

/// A document store keeping one file per document in a directory.
///
/// Documents are parsed on first open and cached. Every mutation that
/// modifies at least one node is written through to disk before the call
/// returns; the write goes to a hidden temporary file which is then renamed
/// over the document.
///
/// Document names are file names: they may not be empty, start with `.`,
/// or contain path separators.
///
/// # Example
///
/// ```no_run
/// use entidoc_session::{DocumentStore, FileStore};
/// use std::path::Path;
///
/// let store = FileStore::open_with_create_dirs(Path::new("data")).unwrap();
/// store.create("DMSUsers.xml", "<DMS><users/></DMS>").unwrap();
/// ```
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    cache: RwLock<HashMap<String, Arc<DocumentCell>>>,
}

impl FileStore {
    /// Opens a store over an existing directory.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if `dir` does not exist or is not a directory.
    pub fn open(dir: &Path) -> SessionResult<Self> {
        let meta = fs::metadata(dir)?;
        if !meta.is_dir() {
            return Err(SessionError::Io(io::Error::new(
                io::ErrorKind::Other,
                format!("{} is not a directory", dir.display()),
            )));
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Opens a store, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open_with_create_dirs(dir: &Path) -> SessionResult<Self> {
        fs::create_dir_all(dir)?;
        Self::open(dir)
    }

    /// Returns the directory holding the documents.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> SessionResult<PathBuf> {
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && !name.contains(['/', '\\', '\0']);
        if valid {
            Ok(self.dir.join(name))
        } else {
            Err(SessionError::InvalidName {
                name: name.to_string(),
            })
        }
    }

    fn cell(&self, name: &str) -> SessionResult<Arc<DocumentCell>> {
        if let Some(cell) = self.cache.read().get(name) {
            return Ok(Arc::clone(cell));
        }

        let path = self.path_for(name)?;
        let xml = match fs::read_to_string(&path) {
            Ok(xml) => xml,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SessionError::DocumentNotFound {
                    name: name.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        let doc = Document::parse(name, &xml)?;

        let mut cache = self.cache.write();
        let cell = cache
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(DocumentCell::new(name, doc, Some(path))));
        Ok(Arc::clone(cell))
    }
}

impl DocumentStore for FileStore {
    fn open(&self, name: &str) -> SessionResult<Box<dyn DocumentSession>> {
        Ok(Box::new(SharedSession::new(self.cell(name)?)))
    }

    fn create(&self, name: &str, xml: &str) -> SessionResult<()> {
        let path = self.path_for(name)?;
        let doc = Document::parse(name, xml)?;

        let mut cache = self.cache.write();
        if cache.contains_key(name) || path.exists() {
            return Err(SessionError::DocumentExists {
                name: name.to_string(),
            });
        }
        write_document(&path, &doc)?;
        cache.insert(
            name.to_string(),
            Arc::new(DocumentCell::new(name, doc, Some(path))),
        );
        Ok(())
    }

    fn contains(&self, name: &str) -> bool {
        match self.path_for(name) {
            Ok(path) => self.cache.read().contains_key(name) || path.is_file(),
            Err(_) => false,
        }
    }

    fn delete(&self, name: &str) -> SessionResult<()> {
        let path = self.path_for(name)?;
        let cached = self.cache.write().remove(name).is_some();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound && !cached => {
                Err(SessionError::DocumentNotFound {
                    name: name.to_string(),
                })
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn names(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|e| e.file_name().into_string().ok())
            .filter(|n| !n.starts_with('.'))
            .collect();
        names.sort();
        names
    }
}
