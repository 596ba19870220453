use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Hands out object-URL-style preview tokens for image files and tracks the
/// live ones so each is revoked exactly once. Icon-keyed previews never go
/// through the registry.
#[derive(Debug, Default, Clone)]
pub struct PreviewRegistry {
    live: Arc<Mutex<HashSet<String>>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_object_url(&self) -> String {
        let url = format!("blob:{}", Uuid::new_v4());
        self.live.lock().expect("registry lock poisoned").insert(url.clone());
        url
    }

    /// Returns true if the token was live. A second revoke of the same token
    /// is a no-op returning false.
    pub fn revoke(&self, url: &str) -> bool {
        self.live.lock().expect("registry lock poisoned").remove(url)
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().expect("registry lock poisoned").len()
    }
}

/// Static icon key for non-image files. Unrecognized MIME types get the
/// generic icon, never a rejection.
pub fn icon_for_mime(mime_type: &str) -> &'static str {
    if mime_type.starts_with("image/") {
        "image-file"
    } else if mime_type.starts_with("application/pdf") {
        "pdf-file"
    } else if mime_type.contains("word") || mime_type.contains("document") {
        "doc-file"
    } else if mime_type.contains("excel") || mime_type.contains("spreadsheet") {
        "xls-file"
    } else if mime_type.contains("text/") {
        "txt-file"
    } else {
        "generic-file"
    }
}

/// Human-readable file size for display.
pub fn format_file_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1_048_576 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1_073_741_824 {
        format!("{:.1} MB", bytes as f64 / 1_048_576.0)
    } else {
        format!("{:.1} GB", bytes as f64 / 1_073_741_824.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_url_revoked_exactly_once() {
        let registry = PreviewRegistry::new();
        let url = registry.create_object_url();

        assert_eq!(registry.live_count(), 1);
        assert!(registry.revoke(&url));
        assert!(!registry.revoke(&url));
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn test_tokens_are_unique() {
        let registry = PreviewRegistry::new();
        let a = registry.create_object_url();
        let b = registry.create_object_url();

        assert_ne!(a, b);
        assert_eq!(registry.live_count(), 2);
    }

    #[test]
    fn test_icon_for_mime() {
        assert_eq!(icon_for_mime("application/pdf"), "pdf-file");
        assert_eq!(icon_for_mime("application/vnd.ms-excel"), "xls-file");
        assert_eq!(icon_for_mime("text/plain"), "txt-file");
        assert_eq!(icon_for_mime("application/octet-stream"), "generic-file");
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(2048), "2.0 KB");
        assert_eq!(format_file_size(5 * 1_048_576), "5.0 MB");
    }
}
