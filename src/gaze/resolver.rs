use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::geometry::{Point, Rect};

/// A word as laid out on screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordRect {
    pub word: String,
    pub rect: Rect,
}

impl WordRect {
    pub fn new(word: impl Into<String>, rect: Rect) -> Self {
        Self {
            word: word.into(),
            rect,
        }
    }
}

/// Immutable snapshot of every word rectangle from one layout pass.
///
/// Snapshots are replaced wholesale; nothing edits one in place. Words are
/// trimmed on the way in and blank words are dropped. A word may appear
/// several times when it occurs in several places in the text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WordFrames {
    rects: Vec<WordRect>,
    #[serde(default)]
    generation: u64,
}

impl WordFrames {
    pub fn new(rects: impl IntoIterator<Item = WordRect>) -> Self {
        let rects = rects
            .into_iter()
            .filter_map(|wr| {
                let word = wr.word.trim();
                if word.is_empty() {
                    None
                } else {
                    Some(WordRect::new(word, wr.rect))
                }
            })
            .collect();
        Self {
            rects,
            generation: 0,
        }
    }

    /// Build from a word-keyed map; iteration (and so match) order is the
    /// map's sorted key order.
    pub fn from_map(map: &BTreeMap<String, Rect>) -> Self {
        Self::new(
            map.iter()
                .map(|(word, rect)| WordRect::new(word.clone(), *rect)),
        )
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.rects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WordRect> {
        self.rects.iter()
    }

    /// Every rectangle registered for `word`.
    pub fn rects_for<'a>(&'a self, word: &'a str) -> impl Iterator<Item = &'a Rect> + 'a {
        let word = word.trim();
        self.rects
            .iter()
            .filter(move |wr| wr.word == word)
            .map(|wr| &wr.rect)
    }
}

/// Shared handle to a published snapshot.
pub type WordFramesSnapshot = Arc<WordFrames>;

/// Word whose rectangle contains `point`; the first match in snapshot order
/// wins when rectangles overlap.
pub fn resolve(point: Point, frames: &WordFrames) -> Option<&str> {
    if !point.is_finite() {
        return None;
    }
    frames
        .rects
        .iter()
        .find(|wr| wr.rect.contains(point))
        .map(|wr| wr.word.as_str())
}
