// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Filename handling: evidence-type taxonomy, MIME guessing, and the safe
// name fragment used in stored blob names.

use std::path::Path;

use custodia_core::types::EvidenceType;

/// Lowercased extension of `filename`, without the dot.
fn extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

/// Map a filename to its taxonomy bucket by extension, case-insensitively.
///
/// Archives fall into `StructuredData`; anything unrecognised (including a
/// missing extension) is `Other`.
pub fn classify_type(filename: &str) -> EvidenceType {
    let Some(ext) = extension(filename) else {
        return EvidenceType::Other;
    };
    match ext.as_str() {
        "png" | "jpg" | "jpeg" | "gif" | "bmp" | "tiff" | "tif" | "webp" | "heic" => {
            EvidenceType::Image
        }
        "mp4" | "avi" | "mov" | "mkv" | "flv" | "wmv" | "webm" | "m4v" => EvidenceType::Video,
        "mp3" | "wav" | "aac" | "flac" | "m4a" | "ogg" | "wma" => EvidenceType::Audio,
        "pdf" | "doc" | "docx" | "xls" | "xlsx" | "ppt" | "pptx" | "odt" | "txt" => {
            EvidenceType::Document
        }
        "eml" | "msg" | "mbox" => EvidenceType::Email,
        "html" | "htm" | "mht" | "mhtml" => EvidenceType::WebCapture,
        "json" | "xml" | "csv" | "sql" | "db" | "sqlite" => EvidenceType::StructuredData,
        // Archives
        "zip" | "rar" | "7z" | "tar" | "gz" | "bz2" => EvidenceType::StructuredData,
        _ => EvidenceType::Other,
    }
}

/// Best-effort MIME type from the extension.
pub fn guess_mime(filename: &str) -> Option<&'static str> {
    let mime = match extension(filename)?.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "mp4" | "m4v" => "video/mp4",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "flv" => "video/x-flv",
        "wmv" => "video/x-ms-wmv",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        "wav" => "audio/x-wav",
        "aac" => "audio/aac",
        "flac" => "audio/flac",
        "m4a" => "audio/mp4",
        "ogg" => "audio/ogg",
        "wma" => "audio/x-ms-wma",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "odt" => "application/vnd.oasis.opendocument.text",
        "txt" => "text/plain",
        "eml" | "mbox" => "message/rfc822",
        "msg" => "application/vnd.ms-outlook",
        "html" | "htm" => "text/html",
        "mht" | "mhtml" => "multipart/related",
        "json" => "application/json",
        "xml" => "application/xml",
        "csv" => "text/csv",
        "sql" => "application/sql",
        "db" | "sqlite" => "application/vnd.sqlite3",
        "zip" => "application/zip",
        "rar" => "application/vnd.rar",
        "7z" => "application/x-7z-compressed",
        "tar" => "application/x-tar",
        "gz" => "application/gzip",
        "bz2" => "application/x-bzip2",
        _ => return None,
    };
    Some(mime)
}

/// Reduce an uploaded name to a safe ASCII fragment for the stored blob name.
///
/// Path components are discarded, whitespace runs become `_`, and only
/// `[A-Za-z0-9._-]` survive. Leading and trailing dots and underscores are
/// trimmed so the result can never be `..` or a hidden file. An empty result
/// becomes `upload`.
pub fn secure_filename(filename: &str) -> String {
    let flattened: String = filename
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = flattened.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    let trimmed = kept.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        "upload".to_owned()
    } else {
        trimmed.to_owned()
    }
}
