/// Path constants and utilities for the JSON file store
use crate::error::{FormsError, Result};
use std::path::{Path, PathBuf};

// Directory names (relative to the data root)
pub const TEMPLATES_DIR_NAME: &str = "templates";
pub const SEQUENCES_DIR_NAME: &str = "sequences";
pub const SUBMISSIONS_DIR_NAME: &str = "submissions";

const RECORD_EXTENSION: &str = "json";

/// Directory layout of a data root
#[derive(Debug, Clone)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.root.join(TEMPLATES_DIR_NAME)
    }

    pub fn sequences_dir(&self) -> PathBuf {
        self.root.join(SEQUENCES_DIR_NAME)
    }

    pub fn submissions_dir(&self) -> PathBuf {
        self.root.join(SUBMISSIONS_DIR_NAME)
    }

    pub fn template_file(&self, template_id: &str) -> Result<PathBuf> {
        record_file(&self.templates_dir(), template_id)
    }

    pub fn sequence_file(&self, template_id: &str) -> Result<PathBuf> {
        record_file(&self.sequences_dir(), template_id)
    }

    pub fn submission_file(&self, submission_id: &str) -> Result<PathBuf> {
        record_file(&self.submissions_dir(), submission_id)
    }
}

/// Build `<dir>/<id>.json`, rejecting ids that could escape `dir`
pub fn record_file(dir: &Path, id: &str) -> Result<PathBuf> {
    let invalid = id.is_empty()
        || id == "."
        || id.contains("..")
        || id.contains('/')
        || id.contains('\\')
        || id.contains('\0');

    if invalid {
        return Err(FormsError::Persistence(format!(
            "Invalid record id for file storage: {:?}",
            id
        )));
    }

    Ok(dir.join(format!("{}.{}", id, RECORD_EXTENSION)))
}

/// True if the path has the record extension
pub fn is_record_file(path: &Path) -> bool {
    path.is_file() && path.extension().and_then(|s| s.to_str()) == Some(RECORD_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths() {
        let layout = StoreLayout::new("/data/forms");

        assert_eq!(layout.templates_dir(), PathBuf::from("/data/forms/templates"));
        assert_eq!(
            layout.submission_file("abc-123").unwrap(),
            PathBuf::from("/data/forms/submissions/abc-123.json")
        );
    }

    #[test]
    fn test_rejects_escaping_ids() {
        let dir = Path::new("/data/forms/templates");

        assert!(record_file(dir, "../secrets").is_err());
        assert!(record_file(dir, "a/b").is_err());
        assert!(record_file(dir, "").is_err());
        assert!(record_file(dir, "tpl_01").is_ok());
    }
}
