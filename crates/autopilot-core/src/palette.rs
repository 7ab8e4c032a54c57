use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Decorative tags prefixed to commit subjects.
pub const DEFAULT_TAGS: [&str; 40] = [
    "🚀", "✨", "🔧", "🐛", "📝", "🎉", "♻️", "🔥", "🎨", "⚡",
    "🔐", "📦", "🌟", "💡", "🛠️", "🧹", "🧪", "📊", "🏗️", "🔗",
    "🎯", "💫", "🌈", "🦾", "🧩", "🔄", "🏆", "💎", "🌊", "🎭",
    "🔮", "🧲", "🪄", "🌺", "🦋", "🎸", "🏄", "🌙", "🎪", "🧬",
];

/// Hands out tags for one cycle: no repeats until every tag was used once,
/// then uniform choice over the whole palette.
pub struct TagPicker {
    palette: Vec<&'static str>,
    remaining: Vec<&'static str>,
    rng: StdRng,
}

impl TagPicker {
    pub fn new(palette: &[&'static str], rng: StdRng) -> Self {
        Self {
            palette: palette.to_vec(),
            remaining: palette.to_vec(),
            rng,
        }
    }

    /// Picker over [`DEFAULT_TAGS`] seeded from the OS.
    pub fn from_entropy() -> Self {
        Self::new(&DEFAULT_TAGS, StdRng::from_entropy())
    }

    /// Deterministic picker over [`DEFAULT_TAGS`].
    pub fn seeded(seed: u64) -> Self {
        Self::new(&DEFAULT_TAGS, StdRng::seed_from_u64(seed))
    }

    /// Tags not handed out yet this cycle.
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }

    /// Next tag. Returns `None` only for an empty palette.
    pub fn next_tag(&mut self) -> Option<&'static str> {
        if self.remaining.is_empty() {
            return self.palette.choose(&mut self.rng).copied();
        }
        let pick = self.rng.gen_range(0..self.remaining.len());
        Some(self.remaining.swap_remove(pick))
    }
}

/// `"<tag> <message>"`, or the bare message when there is no tag.
pub fn decorate(tag: Option<&str>, message: &str) -> String {
    match tag {
        Some(t) => format!("{t} {message}"),
        None => message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn palette_has_forty_distinct_tags() {
        let set: HashSet<_> = DEFAULT_TAGS.iter().collect();
        assert_eq!(set.len(), 40);
    }

    #[test]
    fn distinct_until_exhausted() {
        let mut picker = TagPicker::seeded(7);
        let tags: Vec<_> = (0..DEFAULT_TAGS.len())
            .map(|_| picker.next_tag().unwrap())
            .collect();
        let set: HashSet<_> = tags.iter().collect();
        assert_eq!(set.len(), DEFAULT_TAGS.len());
        assert_eq!(picker.remaining(), 0);
    }

    #[test]
    fn reuse_after_exhaustion() {
        let mut picker = TagPicker::new(&["a", "b"], StdRng::seed_from_u64(1));
        let first: HashSet<_> = [picker.next_tag().unwrap(), picker.next_tag().unwrap()]
            .into_iter()
            .collect();
        assert_eq!(first.len(), 2);
        for _ in 0..10 {
            let t = picker.next_tag().unwrap();
            assert!(t == "a" || t == "b");
        }
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = TagPicker::seeded(42);
        let mut b = TagPicker::seeded(42);
        for _ in 0..5 {
            assert_eq!(a.next_tag(), b.next_tag());
        }
    }

    #[test]
    fn empty_palette_yields_none() {
        let mut picker = TagPicker::new(&[], StdRng::seed_from_u64(0));
        assert_eq!(picker.next_tag(), None);
    }

    #[test]
    fn decorate_message() {
        assert_eq!(decorate(Some("🚀"), "Add login"), "🚀 Add login");
        assert_eq!(decorate(None, "Add login"), "Add login");
    }
}
