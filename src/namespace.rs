//! Mapping between virtual paths and table keys
//!
//! The namespace is flat: `/` is the only directory and every row appears
//! directly under it as `/<name><extension>`.

use crate::config::FsOptions;

pub const ROOT: &str = "/";

#[derive(Debug, Clone)]
pub struct Namespace {
    extension: String,
    reserved_prefix: String,
}

impl Namespace {
    pub fn new(extension: impl Into<String>, reserved_prefix: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
            reserved_prefix: reserved_prefix.into(),
        }
    }

    pub fn from_options(options: &FsOptions) -> Self {
        Self::new(&options.extension, &options.reserved_prefix)
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn is_root(&self, path: &str) -> bool {
        path == ROOT
    }

    /// Paths under the reserved prefix never resolve against the table.
    pub fn is_reserved(&self, path: &str) -> bool {
        !self.reserved_prefix.is_empty() && path.starts_with(&self.reserved_prefix)
    }

    /// Derive the table key for a path.
    ///
    /// Takes the last path segment (ignoring trailing separators) and strips
    /// the extension when it is a proper suffix. Returns `None` when nothing
    /// is left.
    pub fn key_for(&self, path: &str) -> Option<String> {
        let trimmed = path.trim_end_matches('/');
        let base = match trimmed.rfind('/') {
            Some(idx) => &trimmed[idx + 1..],
            None => trimmed,
        };

        let key = match base.strip_suffix(self.extension.as_str()) {
            Some(stem) if !self.extension.is_empty() => stem,
            _ => base,
        };

        if key.is_empty() { None } else { Some(key.to_string()) }
    }

    /// Directory entry name for a key.
    pub fn entry_name(&self, key: &str) -> String {
        format!("{}{}", key, self.extension)
    }

    /// Full virtual path for a key.
    pub fn path_for(&self, key: &str) -> String {
        format!("{}{}", ROOT, self.entry_name(key))
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::from_options(&FsOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_for_strips_extension_and_separator() {
        let ns = Namespace::default();
        assert_eq!(ns.key_for("/orders.php").as_deref(), Some("orders"));
        assert_eq!(ns.key_for("orders.php").as_deref(), Some("orders"));
        assert_eq!(ns.key_for("/orders").as_deref(), Some("orders"));
        assert_eq!(ns.key_for("/orders.php/").as_deref(), Some("orders"));
    }

    #[test]
    fn test_key_for_only_strips_suffix() {
        let ns = Namespace::default();
        assert_eq!(ns.key_for("/a.php.txt").as_deref(), Some("a.php.txt"));
        assert_eq!(ns.key_for("/a.php.php").as_deref(), Some("a.php"));
        assert_eq!(ns.key_for("/nested/b.php").as_deref(), Some("b"));
    }

    #[test]
    fn test_key_for_empty() {
        let ns = Namespace::default();
        assert_eq!(ns.key_for("/"), None);
        assert_eq!(ns.key_for(""), None);
        assert_eq!(ns.key_for("/.php"), None);
    }

    #[test]
    fn test_path_for_roundtrip() {
        let ns = Namespace::default();
        assert_eq!(ns.entry_name("orders"), "orders.php");
        assert_eq!(ns.path_for("orders"), "/orders.php");
        assert_eq!(ns.key_for(&ns.path_for("orders")).as_deref(), Some("orders"));
    }

    #[test]
    fn test_reserved_prefix() {
        let ns = Namespace::default();
        assert!(ns.is_reserved("/.vscode"));
        assert!(ns.is_reserved("/.vscode/settings.json"));
        assert!(!ns.is_reserved("/vscode.php"));
        assert!(!ns.is_reserved("/"));

        let open = Namespace::new(".php", "");
        assert!(!open.is_reserved("/.vscode/settings.json"));
    }

    #[test]
    fn test_custom_extension() {
        let ns = Namespace::new(".sql", "/.idea");
        assert_eq!(ns.key_for("/report.sql").as_deref(), Some("report"));
        assert_eq!(ns.key_for("/report.php").as_deref(), Some("report.php"));
        assert!(ns.is_reserved("/.idea/workspace.xml"));
        assert!(ns.is_root("/"));
    }
}
