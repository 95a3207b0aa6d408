//! Fixed-capacity dictionaries of words harvested manually, automatically
//! from comparison hooks ("table of recent compares" / TORC), or promoted
//! across runs.

/// Words longer than this are rejected by [`Dictionary::push`].
pub const MAX_WORD_LEN: usize = 64;

/// The dictionary never grows past this many entries; [`Dictionary::push`]
/// is a no-op once full.
pub const MAX_ENTRIES: usize = 16_384;

/// Sentinel for "no position hint" on a [`DictEntry`].
pub const NO_POSITION_HINT: usize = usize::MAX;

/// One dictionary word plus the bookkeeping the mutator uses to decide how
/// often to offer it.
#[derive(Debug, Clone)]
pub struct DictEntry {
    word: Vec<u8>,
    position_hint: usize,
    use_count: u64,
    success_count: u64,
}

impl DictEntry {
    /// Creates an entry with no position hint and zeroed counters.
    #[must_use]
    pub fn new(word: Vec<u8>) -> Self {
        Self {
            word,
            position_hint: NO_POSITION_HINT,
            use_count: 0,
            success_count: 0,
        }
    }

    /// Creates an entry that hints the word is effective at `position`.
    #[must_use]
    pub fn with_position_hint(word: Vec<u8>, position_hint: usize) -> Self {
        Self {
            word,
            position_hint,
            use_count: 0,
            success_count: 0,
        }
    }

    /// The dictionary word.
    #[must_use]
    pub fn word(&self) -> &[u8] {
        &self.word
    }

    /// The position this word tends to be effective at, if known.
    #[must_use]
    pub fn position_hint(&self) -> Option<usize> {
        (self.position_hint != NO_POSITION_HINT).then_some(self.position_hint)
    }

    /// How many times this word has been offered by the mutator.
    #[must_use]
    pub fn use_count(&self) -> u64 {
        self.use_count
    }

    /// How many times offering this word preceded newly-interesting coverage.
    #[must_use]
    pub fn success_count(&self) -> u64 {
        self.success_count
    }

    /// Records that this word was just offered.
    pub fn record_use(&mut self) {
        self.use_count += 1;
    }

    /// Records that offering this word led to new coverage.
    pub fn record_success(&mut self) {
        self.success_count += 1;
    }
}

/// A fixed-capacity table of dictionary words.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    entries: Vec<DictEntry>,
}

impl Dictionary {
    /// Creates an empty dictionary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of words currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the dictionary holds no words.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adds `entry`, silently dropping it if the word is oversized or the
    /// dictionary is already at [`MAX_ENTRIES`].
    pub fn push(&mut self, entry: DictEntry) {
        if entry.word.len() > MAX_WORD_LEN || self.entries.len() >= MAX_ENTRIES {
            return;
        }
        self.entries.push(entry);
    }

    /// Returns the entry at `idx`, if any.
    #[must_use]
    pub fn get(&self, idx: usize) -> Option<&DictEntry> {
        self.entries.get(idx)
    }

    /// Returns the entry at `idx` mutably, if any.
    pub fn get_mut(&mut self, idx: usize) -> Option<&mut DictEntry> {
        self.entries.get_mut(idx)
    }

    /// Clears all entries, keeping the allocation. Used to periodically
    /// rebuild the temporary auto-dictionary.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
