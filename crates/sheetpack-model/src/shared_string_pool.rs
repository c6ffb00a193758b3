use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::RichText;

/// Deduplicated pool of shared-string entries.
///
/// Entries are interned by content equality: plain text must match exactly,
/// rich text must match run-for-run including the phonetic annotation. The
/// pool only tracks unique entries; the total reference count (`count` in the
/// wire header) is the writer's to compute, since it depends on how many
/// cells point at each entry, not on the pool itself.
///
/// The codec rebuilds this pool from scratch on every save rather than
/// maintaining it incrementally.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SharedStringPool {
    items: Vec<RichText>,
    #[serde(skip)]
    index: HashMap<RichText, u32>,
}

impl SharedStringPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pool from entries in file order, deduplicating as it goes.
    ///
    /// Wire tables occasionally contain duplicate `<si>` entries; the first
    /// occurrence wins so existing cell indices keep resolving.
    pub fn from_items(items: Vec<RichText>) -> Self {
        let mut index = HashMap::new();
        for (i, item) in items.iter().enumerate() {
            index.entry(item.clone()).or_insert(i as u32);
        }
        Self { items, index }
    }

    /// Intern an entry, returning its id. Idempotent for content-equal input.
    pub fn intern(&mut self, value: RichText) -> u32 {
        if let Some(id) = self.index.get(&value) {
            return *id;
        }
        let id = self.items.len() as u32;
        self.items.push(value.clone());
        self.index.insert(value, id);
        id
    }

    /// Intern a plain-text entry.
    pub fn intern_plain(&mut self, text: impl Into<String>) -> u32 {
        self.intern(RichText::new(text))
    }

    /// Get an entry by id.
    pub fn get(&self, id: u32) -> Option<&RichText> {
        self.items.get(id as usize)
    }

    /// Number of distinct entries (the wire header's `uniqueCount`).
    pub fn unique_count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = &RichText> {
        self.items.iter()
    }
}

impl<'de> Deserialize<'de> for SharedStringPool {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Helper {
            #[serde(default)]
            items: Vec<RichText>,
        }

        let helper = Helper::deserialize(deserializer)?;
        Ok(SharedStringPool::from_items(helper.items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_text_shares_one_id() {
        let mut pool = SharedStringPool::new();
        let a = pool.intern_plain("Hello");
        let b = pool.intern_plain("Hello");
        let c = pool.intern_plain("World");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(pool.unique_count(), 2);
    }

    #[test]
    fn rich_text_equality_includes_runs_and_phonetic() {
        let mut pool = SharedStringPool::new();
        let plain = pool.intern(RichText::new("Base"));

        let mut annotated = RichText::new("Base");
        annotated.phonetic = Some("PHO".to_string());
        let with_phonetic = pool.intern(annotated);

        assert_ne!(plain, with_phonetic);
        assert_eq!(pool.unique_count(), 2);
    }

    #[test]
    fn from_items_keeps_first_duplicate() {
        let pool = SharedStringPool::from_items(vec![
            RichText::new("x"),
            RichText::new("y"),
            RichText::new("x"),
        ]);
        assert_eq!(pool.unique_count(), 3);
        let mut probe = pool.clone();
        assert_eq!(probe.intern_plain("x"), 0);
    }
}
