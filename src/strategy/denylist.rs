//! Item and category denylist.
//!
//! Cosmetic items (skins, runes) and the `misc` category have baselines
//! too noisy to trust, so they are never evaluated.

use crate::types::SniperError;

/// Words matched case-insensitively anywhere in the item name.
pub const DEFAULT_DENIED_WORDS: &[&str] = &["Skin", "Rune"];

/// Categories matched case-insensitively against the whole category.
pub const DEFAULT_DENIED_CATEGORIES: &[&str] = &["misc"];

#[derive(Debug, Clone)]
pub struct Denylist {
    words: Vec<String>,
    categories: Vec<String>,
}

impl Default for Denylist {
    fn default() -> Self {
        Self {
            words: DEFAULT_DENIED_WORDS.iter().map(|w| w.to_lowercase()).collect(),
            categories: DEFAULT_DENIED_CATEGORIES.iter().map(|c| c.to_lowercase()).collect(),
        }
    }
}

impl Denylist {
    /// Build a denylist. Blank entries are rejected: an empty word would
    /// match every item name.
    pub fn new<W, C>(words: W, categories: C) -> Result<Self, SniperError>
    where
        W: IntoIterator,
        W::Item: AsRef<str>,
        C: IntoIterator,
        C::Item: AsRef<str>,
    {
        let words = Self::lowered(words, "word")?;
        let categories = Self::lowered(categories, "category")?;
        Ok(Self { words, categories })
    }

    fn lowered<I>(entries: I, kind: &str) -> Result<Vec<String>, SniperError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        entries
            .into_iter()
            .map(|e| {
                let e = e.as_ref();
                if e.trim().is_empty() {
                    Err(SniperError::Configuration(format!("blank denylist {kind}")))
                } else {
                    Ok(e.to_lowercase())
                }
            })
            .collect()
    }

    /// Whether a listing with this name and category must be ignored.
    pub fn is_denied(&self, item_name: &str, category: &str) -> bool {
        let name = item_name.to_lowercase();
        if self.words.iter().any(|w| name.contains(w.as_str())) {
            return true;
        }
        let category = category.to_lowercase();
        self.categories.iter().any(|c| *c == category)
    }
}
