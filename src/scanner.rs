//! Document folder scanner.
//!
//! Lists the supported files directly inside the configured folder (no
//! recursion) and computes each file's effective modification time.

use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tracing::warn;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::models::DocumentCandidate;

/// Extensions imported as whole files by the knowledge base.
pub const STRUCTURED_EXTENSIONS: &[&str] = &["pdf", "docx"];
/// Extensions read as UTF-8 and imported as text.
pub const TEXT_EXTENSIONS: &[&str] = &["txt", "md"];

pub fn is_supported(extension: &str) -> bool {
    STRUCTURED_EXTENSIONS.contains(&extension) || TEXT_EXTENSIONS.contains(&extension)
}

/// `max(modified, created)`, or `modified` when the platform has no creation time.
pub fn effective_modified_at(
    modified: DateTime<Utc>,
    created: Option<DateTime<Utc>>,
) -> DateTime<Utc> {
    match created {
        Some(created) if created > modified => created,
        _ => modified,
    }
}

pub fn scan(folder: &Path) -> Result<Vec<DocumentCandidate>> {
    if !folder.is_dir() {
        return Err(Error::NotFound(folder.to_path_buf()));
    }

    let mut candidates = Vec::new();
    for entry in WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                // broken symlink or unreadable entry
                warn!(error = %e, "skipping folder entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if !is_supported(&extension) {
            continue;
        }

        let metadata = entry.metadata().map_err(|e| Error::Io(e.into()))?;
        let modified = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| DateTime::<Utc>::from(SystemTime::UNIX_EPOCH));
        let created = metadata.created().ok().map(DateTime::<Utc>::from);

        candidates.push(DocumentCandidate {
            path: path.to_path_buf(),
            name: entry.file_name().to_string_lossy().to_string(),
            extension,
            size_bytes: metadata.len(),
            effective_modified_at: effective_modified_at(modified, created),
        });
    }

    candidates.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn effective_time_is_the_later_of_the_two() {
        let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        assert_eq!(effective_modified_at(t1, Some(t2)), t2);
        assert_eq!(effective_modified_at(t2, Some(t1)), t2);
        assert_eq!(effective_modified_at(t1, None), t1);
    }

    #[test]
    fn scan_filters_and_sorts() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("zeta.md"), "z").unwrap();
        fs::write(tmp.path().join("alpha.TXT"), "a").unwrap();
        fs::write(tmp.path().join("image.png"), "p").unwrap();
        fs::write(tmp.path().join("report.pdf"), "%PDF").unwrap();
        fs::create_dir(tmp.path().join("nested")).unwrap();
        fs::write(tmp.path().join("nested").join("inner.md"), "i").unwrap();

        let names: Vec<String> = scan(tmp.path()).unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["alpha.TXT", "report.pdf", "zeta.md"]);
    }

    #[test]
    fn extension_is_lowercased() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("Notes.MD"), "hello").unwrap();
        let candidates = scan(tmp.path()).unwrap();
        assert_eq!(candidates[0].extension, "md");
        assert_eq!(candidates[0].size_bytes, 5);
    }

    #[test]
    fn empty_folder_yields_nothing() {
        let tmp = TempDir::new().unwrap();
        assert!(scan(tmp.path()).unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_documents_are_listed() {
        let tmp = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let target = outside.path().join("real.md");
        fs::write(&target, "linked body").unwrap();
        fs::write(tmp.path().join("plain.md"), "p").unwrap();
        std::os::unix::fs::symlink(&target, tmp.path().join("linked.md")).unwrap();
        std::os::unix::fs::symlink(outside.path().join("gone.md"), tmp.path().join("dangling.md"))
            .unwrap();

        let candidates = scan(tmp.path()).unwrap();
        let names: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["linked.md", "plain.md"]);
        assert_eq!(candidates[0].size_bytes, "linked body".len() as u64);
    }

    #[test]
    fn missing_folder_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = scan(&tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
