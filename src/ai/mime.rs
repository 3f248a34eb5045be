/// Image MIME type from the file signature, if it is a format we recognise.
pub fn sniff_image_mime(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("image/webp"),
        [0x47, 0x49, 0x46, 0x38, ..] => Some("image/gif"),
        _ => None,
    }
}

/// Warn when the client-declared MIME type disagrees with the image bytes.
///
/// Mismatches are not rejected: the provider sniffs the data itself, and
/// formats we do not recognise (HEIC and friends) are common from phones.
pub fn check_declared_mime(declared: &str, bytes: &[u8]) -> bool {
    let declared = declared.trim();
    let declared = if declared.eq_ignore_ascii_case("image/jpg") {
        "image/jpeg"
    } else {
        declared
    };

    match sniff_image_mime(bytes) {
        Some(sniffed) if !sniffed.eq_ignore_ascii_case(declared) => {
            tracing::warn!(
                "Declared mimeType {} does not match image signature {}",
                declared,
                sniffed
            );
            false
        }
        Some(_) => true,
        None => {
            tracing::debug!(
                "Unrecognized image format (first 4 bytes: {:02X?}), trusting declared {}",
                &bytes[..bytes.len().min(4)],
                declared
            );
            true
        }
    }
}
