use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(pub String);

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ArticleId {
    fn from(id: &str) -> Self {
        ArticleId(id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub id: ArticleId,
    pub url: String,
}

impl Article {
    pub fn new(id: impl Into<ArticleId>, url: impl Into<String>) -> Article {
        Article {
            id: id.into(),
            url: url.into(),
        }
    }
}

impl From<String> for ArticleId {
    fn from(id: String) -> Self {
        ArticleId(id)
    }
}

/// Normalized URLs already visited during one scan. Never shrinks.
#[derive(Debug, Default)]
pub struct SeenUrls {
    urls: HashSet<String>,
}

impl SeenUrls {
    pub fn new() -> SeenUrls {
        SeenUrls::default()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    /// Returns false if the url was already seen.
    pub fn visit(&mut self, url: String) -> bool {
        self.urls.insert(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// Normalized URL was already seen; a delete has been queued.
    Duplicate(Article),
    /// First occurrence, but the saved URL carries trackers.
    Tracked(Article),
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Observation::Duplicate(article) => write!(f, "Duplicate article found: {}", article.url),
            Observation::Tracked(article) => {
                write!(f, "Article with trackers found: {}", article.url)
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct ScanReport {
    pub total: usize,
    pub observations: Vec<Observation>,
}

impl ScanReport {
    pub fn duplicates(&self) -> impl Iterator<Item = &Article> {
        self.observations.iter().filter_map(|o| match o {
            Observation::Duplicate(article) => Some(article),
            Observation::Tracked(_) => None,
        })
    }

    pub fn tracked(&self) -> impl Iterator<Item = &Article> {
        self.observations.iter().filter_map(|o| match o {
            Observation::Tracked(article) => Some(article),
            Observation::Duplicate(_) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Delete { item_id: ArticleId },
}
