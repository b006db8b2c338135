use log::{debug, error};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Request path -> file location for every regular file under a root folder.
///
/// Keys are built only from entries found by walking the root, so a key
/// always names a descendant of the root and never contains `.` or `..`
/// segments.
#[derive(Debug, Default)]
pub struct FileIndex {
    files: HashMap<String, PathBuf>,
}

impl FileIndex {
    /// Walks `root` recursively, following symlinks, and keeps the regular
    /// files. Walk errors are logged and the offending entries skipped; an
    /// unreadable root gives an empty index.
    pub fn scan(root: &Path) -> Self {
        let mut files = HashMap::new();

        for entry in WalkDir::new(root).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    error!("Error reading files: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            match request_key(root, entry.path()) {
                Some(key) => {
                    files.insert(key, entry.into_path());
                }
                None => debug!("Skipping unservable file name: {:?}", entry.path()),
            }
        }

        Self { files }
    }

    pub fn get(&self, request_path: &str) -> Option<&Path> {
        self.files.get(request_path).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// `root/css/site.css` -> `/css/site.css`. `None` for names that are not
/// valid UTF-8, since no request path could ever match them.
fn request_key(root: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(root).ok()?;

    let mut key = String::new();
    for segment in relative.iter() {
        key.push('/');
        key.push_str(segment.to_str()?);
    }

    if key.is_empty() { None } else { Some(key) }
}
