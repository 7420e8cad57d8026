//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

// ============================================================================
// Common Defaults
// ============================================================================

pub fn r#true() -> bool {
    true
}

#[allow(unused)]
pub fn r#false() -> bool {
    false
}

// ============================================================================
// [base] Section Defaults
// ============================================================================

pub mod base {
    pub fn url() -> Option<String> {
        None
    }

    pub fn author() -> String {
        "<YOUR_NAME>".into()
    }

    pub fn language() -> String {
        "en-US".into()
    }
}

// ============================================================================
// [build] Section Defaults
// ============================================================================

pub mod build {
    use std::path::PathBuf;

    pub fn root() -> Option<PathBuf> {
        None
    }

    pub fn content() -> PathBuf {
        "posts".into()
    }

    pub fn public() -> PathBuf {
        "public".into()
    }

    pub fn output() -> PathBuf {
        "dist".into()
    }

    pub fn template() -> PathBuf {
        "index.html".into()
    }

    pub fn generate() -> PathBuf {
        "generate".into()
    }

    pub mod bundler {
        pub fn command() -> Vec<String> {
            Vec::new()
        }
    }
}

// ============================================================================
// [posts] Section Defaults
// ============================================================================

pub mod posts {
    pub fn num_per_page() -> usize {
        10
    }

    pub fn synopsis_max_length() -> usize {
        280
    }
}
