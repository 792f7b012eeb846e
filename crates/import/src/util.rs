use std::path::Path;

/// Decode statement bytes as UTF-8, falling back to Latin-1 byte-for-byte.
/// A leading byte-order mark is dropped.
pub fn decode_text(data: &[u8]) -> String {
    let text = match std::str::from_utf8(data) {
        Ok(s) => s.to_string(),
        // Latin-1 code points map 1:1 onto the first 256 Unicode scalars.
        Err(_) => data.iter().map(|&b| char::from(b)).collect(),
    };
    match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    }
}

/// Lower-cased extension of `filename`, or an empty string when it has none.
pub fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_lowercase()
}
