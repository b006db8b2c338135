//! Content-Type lookup by file extension.

use std::path::Path;

/// Content type of `file`, taken from the text after the last `.` of its
/// name, or the whole name when it has no `.` (a file called `css` is a
/// stylesheet). The lookup is case-sensitive and anything unknown is plain
/// text.
pub fn content_type(file: &Path) -> &'static str {
    let extension = file
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.rsplit('.').next());

    match extension {
        Some("html") => "text/html",
        Some("css") => "text/css",
        Some("js") => "text/javascript",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        Some("svg") => "image/svg+xml",
        _ => "text/plain",
    }
}
