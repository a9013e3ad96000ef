use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::page::PageDocument;

/// How a snapshot file's bytes are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Html,
    /// Plain visible text, e.g. copied from a browser
    Text,
}

impl SnapshotFormat {
    fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "html" | "htm" => Some(Self::Html),
            "txt" => Some(Self::Text),
            _ => None,
        }
    }
}

/// A saved page discovered under the snapshot root.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    pub path: PathBuf,
    pub format: SnapshotFormat,
}

impl SnapshotFile {
    pub fn load(&self) -> io::Result<PageDocument> {
        let content = std::fs::read_to_string(&self.path)?;
        let url = self.path.display().to_string();
        Ok(match self.format {
            SnapshotFormat::Html => PageDocument::new(url, content),
            SnapshotFormat::Text => PageDocument::from_text(url, &content),
        })
    }
}

/// Walk `root` recursively for `.html`, `.htm` and `.txt` files, in path
/// order. Hidden files and directories are skipped.
pub fn scan_snapshots(root: &Path) -> Vec<SnapshotFile> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !e
                    .file_name()
                    .to_str()
                    .is_some_and(|n| n.starts_with('.'))
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let format = e
                .path()
                .extension()
                .and_then(|x| x.to_str())
                .and_then(SnapshotFormat::from_extension)?;
            Some(SnapshotFile {
                path: e.into_path(),
                format,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_scan_picks_snapshot_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("filelijst.html"), "<p>A2</p>").unwrap();
        fs::write(root.join("notes.txt"), "A67 + 5 min").unwrap();
        fs::write(root.join("config.json"), "{}").unwrap();
        fs::write(root.join(".cache.html"), "x").unwrap();
        fs::create_dir(root.join("older")).unwrap();
        fs::write(root.join("older").join("flitsers.HTM"), "<p>flitser</p>").unwrap();
        fs::create_dir(root.join(".git")).unwrap();
        fs::write(root.join(".git").join("index.html"), "x").unwrap();

        let files = scan_snapshots(root);
        let names: Vec<String> = files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["filelijst.html", "notes.txt", "flitsers.HTM"]);
        assert_eq!(files[1].format, SnapshotFormat::Text);
        assert_eq!(files[2].format, SnapshotFormat::Html);
    }

    #[test]
    fn test_load_text_snapshot_keeps_visible_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.txt");
        fs::write(&path, "A2 Eindhoven → Weert <b>+ 15 min</b>").unwrap();
        let doc = SnapshotFile {
            path,
            format: SnapshotFormat::Text,
        }
        .load()
        .unwrap();
        assert!(doc.visible_text().contains("<b>+ 15 min</b>"));
    }

    #[test]
    fn test_missing_root_is_empty() {
        assert!(scan_snapshots(Path::new("/nonexistent/snapshots")).is_empty());
    }
}
