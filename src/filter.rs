//! Category filter shared by the crawler and the normalizer
//!
//! A listing is kept only when its category code is allow-listed and the
//! gallery it was recommended in is not deny-listed. This is the only
//! inclusion rule in the crate.

use crate::config::FilterConfig;
use crate::crawler::CandidateListing;
use std::collections::HashSet;

/// Allow-list of category codes plus deny-list of gallery titles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryFilter {
    allowed_categories: HashSet<String>,
    denied_titles: HashSet<String>,
}

impl CategoryFilter {
    pub fn new<A, D>(allowed_categories: A, denied_titles: D) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        D: IntoIterator,
        D::Item: Into<String>,
    {
        Self {
            allowed_categories: allowed_categories
                .into_iter()
                .map(|c| c.into().trim().to_string())
                .collect(),
            denied_titles: denied_titles
                .into_iter()
                .map(|t| t.into().trim().to_string())
                .collect(),
        }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(
            config.allowed_categories.iter().cloned(),
            config.denied_gallery_titles.iter().cloned(),
        )
    }

    /// Decides whether a candidate should be followed
    pub fn accept(&self, candidate: &CandidateListing) -> bool {
        self.accepts(
            candidate.category_code.as_deref(),
            candidate.gallery_title.as_deref(),
        )
    }

    /// Decides on raw fields; a missing category is never accepted
    pub fn accepts(&self, category_code: Option<&str>, gallery_title: Option<&str>) -> bool {
        let Some(code) = category_code.map(str::trim) else {
            return false;
        };
        if !self.allowed_categories.contains(code) {
            return false;
        }
        match gallery_title.map(str::trim) {
            Some(title) => !self.denied_titles.contains(title),
            None => true,
        }
    }
}

impl Default for CategoryFilter {
    fn default() -> Self {
        Self::from_config(&FilterConfig::default())
    }
}
