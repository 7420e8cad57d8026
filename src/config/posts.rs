//! `[posts]` section configuration.
//!
//! Controls how the content pipeline chunks and summarizes posts.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[posts]` section in lithograph.toml - post listing settings.
///
/// # Example
/// ```toml
/// [posts]
/// num_per_page = 10
/// synopsis_max_length = 280
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct PostsConfig {
    /// Number of posts per listing page data file.
    #[serde(default = "defaults::posts::num_per_page")]
    #[educe(Default = defaults::posts::num_per_page())]
    pub num_per_page: usize,

    /// Maximum synopsis length in characters, taken from the post body.
    #[serde(default = "defaults::posts::synopsis_max_length")]
    #[educe(Default = defaults::posts::synopsis_max_length())]
    pub synopsis_max_length: usize,
}
