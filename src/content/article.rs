use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use super::vocabulary::Vocabulary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    pub min: u32,
    pub max: u32,
}

impl AgeRange {
    pub fn contains(&self, age: u32) -> bool {
        (self.min..=self.max).contains(&age)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub title: String,
    pub content: String,
    pub target_age: AgeRange,
    pub difficult_words: Vocabulary,
}

impl Article {
    /// Whitespace-separated tokens of the article body, in reading order.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.content.split_whitespace()
    }

    /// Paragraphs (blank-line separated), each as its token list.
    pub fn paragraphs(&self) -> Vec<Vec<&str>> {
        self.content
            .split("\n\n")
            .map(|p| p.split_whitespace().collect::<Vec<_>>())
            .filter(|p| !p.is_empty())
            .collect()
    }
}

/// Load the article list from a JSON file (`[{ "title": ..., ... }]`).
pub fn load_articles(path: &Path) -> Result<Vec<Article>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read articles from {}", path.display()))?;
    let articles: Vec<Article> = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse articles in {}", path.display()))?;

    for article in &articles {
        if article.target_age.min > article.target_age.max {
            bail!(
                "article '{}' has an inverted target age range {}..={}",
                article.title,
                article.target_age.min,
                article.target_age.max
            );
        }
    }

    Ok(articles)
}
