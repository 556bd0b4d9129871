//! Synthetic file header
//!
//! Every file handed to the editor starts with `<?` and a newline so it is
//! picked up as PHP. The header only exists on the way out: [`present`] adds
//! it on read and [`strip`] removes one leading occurrence on write, so it is
//! never persisted.

/// Marker prepended to every file body.
pub const MARKER: &str = "<?";

/// Stored code as file content.
pub fn present(code: &str) -> Vec<u8> {
    let mut content = Vec::with_capacity(MARKER.len() + 1 + code.len());
    content.extend_from_slice(MARKER.as_bytes());
    content.push(b'\n');
    content.extend_from_slice(code.as_bytes());
    content
}

/// File content as code to store.
///
/// Removes the marker (and the newline after it, if any) only at the very
/// start. Invalid UTF-8 is replaced rather than rejected.
pub fn strip(content: &[u8]) -> String {
    let text = String::from_utf8_lossy(content);
    match text.strip_prefix(MARKER) {
        Some(rest) => rest.strip_prefix('\n').unwrap_or(rest).to_string(),
        None => text.into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_present_prepends_marker() {
        assert_eq!(present("echo 1;"), b"<?\necho 1;".to_vec());
        assert_eq!(present(""), b"<?\n".to_vec());
    }

    #[test]
    fn test_strip_marker_with_newline() {
        assert_eq!(strip(b"<?\necho 1;"), "echo 1;");
    }

    #[test]
    fn test_strip_marker_without_newline() {
        assert_eq!(strip(b"<?echo 1;"), "echo 1;");
    }

    #[test]
    fn test_strip_only_once() {
        assert_eq!(strip(b"<?\n<?\nx"), "<?\nx");
    }

    #[test]
    fn test_strip_keeps_mid_body_marker() {
        assert_eq!(strip(b"a <? b\n<?\n"), "a <? b\n<?\n");
        assert_eq!(strip(b" <?x"), " <?x");
    }

    #[test]
    fn test_strip_inverts_present() {
        for code in ["", "x", "<?inner", "\n\nline"] {
            assert_eq!(strip(&present(code)), code);
        }
    }
}
