//! Shared document state and the session type both stores hand out.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::{SessionError, SessionResult};
use crate::session::DocumentSession;
use crate::xml::Document;
use crate::{xpath, xupdate};

/// One loaded document, shared by every session opened on it.
#[derive(Debug)]
pub(crate) struct DocumentCell {
    name: String,
    doc: RwLock<Document>,
    /// Backing file for write-through, if any.
    path: Option<PathBuf>,
}

impl DocumentCell {
    pub(crate) fn new(name: &str, doc: Document, path: Option<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            doc: RwLock::new(doc),
            path,
        }
    }
}

/// Writes `doc` to `path` through a temporary sibling file and a rename,
/// so readers never observe a partially written document.
pub(crate) fn write_document(path: &Path, doc: &Document) -> SessionResult<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));

    let mut file = File::create(&tmp)?;
    file.write_all(doc.to_xml().as_bytes())?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp, path)?;
    Ok(())
}

/// A session over a [`DocumentCell`].
#[derive(Debug)]
pub(crate) struct SharedSession {
    cell: Arc<DocumentCell>,
    open: bool,
}

impl SharedSession {
    pub(crate) fn new(cell: Arc<DocumentCell>) -> Self {
        Self { cell, open: true }
    }

    fn ensure_open(&self) -> SessionResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(SessionError::Closed)
        }
    }
}

impl DocumentSession for SharedSession {
    fn document(&self) -> &str {
        &self.cell.name
    }

    fn query(&self, expr: &str) -> SessionResult<Vec<String>> {
        self.ensure_open()?;
        let doc = self.cell.doc.read();
        let results = xpath::query(&doc, expr)?;
        debug!(
            document = %self.cell.name,
            expr,
            results = results.len(),
            "query"
        );
        Ok(results)
    }

    fn mutate(&mut self, fragment: &str) -> SessionResult<u64> {
        self.ensure_open()?;
        let mut doc = self.cell.doc.write();
        let (next, modified) = xupdate::stage(&doc, fragment)?;
        if modified > 0 {
            if let Some(path) = &self.cell.path {
                write_document(path, &next)?;
            }
            *doc = next;
        }
        debug!(
            document = %self.cell.name,
            fragment,
            modified,
            "mutate"
        );
        Ok(modified)
    }

    fn content(&self) -> SessionResult<String> {
        self.ensure_open()?;
        Ok(self.cell.doc.read().to_xml())
    }

    fn close(&mut self) -> SessionResult<()> {
        self.open = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> SharedSession {
        let doc = Document::parse("t", "<DMS><users/></DMS>").unwrap();
        SharedSession::new(Arc::new(DocumentCell::new("t", doc, None)))
    }

    #[test]
    fn closed_session_rejects_calls() {
        let mut s = session();
        assert!(s.exists("/DMS/users").unwrap());
        s.close().unwrap();
        assert!(matches!(s.query("/DMS"), Err(SessionError::Closed)));
        assert!(matches!(s.content(), Err(SessionError::Closed)));
        assert!(matches!(s.mutate("<x/>"), Err(SessionError::Closed)));
        s.close().unwrap();
    }

    #[test]
    fn sessions_share_the_document() {
        let doc = Document::parse("t", "<DMS><users/></DMS>").unwrap();
        let cell = Arc::new(DocumentCell::new("t", doc, None));
        let mut writer = SharedSession::new(Arc::clone(&cell));
        let reader = SharedSession::new(cell);

        writer
            .mutate(
                "<xupdate:modifications version=\"1.0\" xmlns:xupdate=\"http://www.xmldb.org/xupdate\">\
                 <xupdate:append select=\"/DMS/users\"><user id=\"1\"/></xupdate:append>\
                 </xupdate:modifications>",
            )
            .unwrap();
        assert_eq!(reader.query("/DMS/users/user/@id").unwrap(), vec!["1"]);
    }

    #[test]
    fn write_document_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("DMSUsers.xml");
        let doc = Document::parse("t", "<DMS><users/></DMS>").unwrap();
        write_document(&path, &doc).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("<DMS><users/></DMS>"));
        assert!(!dir.path().join(".DMSUsers.xml.tmp").exists());
    }
}
