//! Content-Type lookup for stored artifacts.
//!
//! Types come from the `mime_guess` extension table, with vector tile
//! extensions overridden to protobuf. Textual types and JSON get an explicit
//! UTF-8 charset so browsers don't guess.

use std::path::Path;

use http::header::{HeaderValue, CONTENT_TYPE};
use http::HeaderMap;

/// Content type used for Mapbox vector tiles.
pub const PROTOBUF_CONTENT_TYPE: &str = "application/x-protobuf";

/// Extensions always served as protobuf.
const PROTOBUF_EXTENSIONS: &[&str] = &["pbf", "vtile"];

const CHARSET_SUFFIX: &str = "; charset=UTF-8";

/// Return the Content-Type value for the file at `path`.
///
/// Unknown extensions resolve to `application/octet-stream`.
pub fn content_type_for(path: impl AsRef<Path>) -> String {
    let path = path.as_ref();

    let is_protobuf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            PROTOBUF_EXTENSIONS
                .iter()
                .any(|candidate| ext.eq_ignore_ascii_case(candidate))
        });
    if is_protobuf {
        return PROTOBUF_CONTENT_TYPE.to_string();
    }

    let mime = mime_guess::from_path(path).first_or_octet_stream();
    let essence = mime.essence_str();

    if mime.type_() == mime_guess::mime::TEXT || essence == "application/json" {
        format!("{essence}{CHARSET_SUFFIX}")
    } else {
        essence.to_string()
    }
}

/// Build a header map whose only entry is the Content-Type for `path`.
pub fn content_type_header(path: impl AsRef<Path>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    // Types from the table are plain ASCII, so this never fails in practice.
    if let Ok(value) = HeaderValue::from_str(&content_type_for(path)) {
        headers.insert(CONTENT_TYPE, value);
    }
    headers
}
