//! Shared file-writing helpers.

use std::io;
use std::path::Path;

/// Makes a user-supplied name safe to use as one path segment.
pub(crate) fn safe_segment(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .map(|ch| match ch {
            '/' | '\\' | '\0' => '_',
            ch if ch.is_control() => '_',
            ch => ch,
        })
        .collect();

    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

/// Writes to a sibling temp file and renames it into place.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "target file has no parent directory",
        ));
    };
    tokio::fs::create_dir_all(parent).await?;

    let tmp = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
    if let Err(error) = tokio::fs::write(&tmp, bytes).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(error);
    }
    tokio::fs::rename(&tmp, path).await
}
