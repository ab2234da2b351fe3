//! Linear undo/redo history over full document snapshots.

/// One committed history entry: a snapshot plus the label of the action
/// that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry<T> {
    snapshot: T,
    label: String,
}

impl<T> HistoryEntry<T> {
    pub fn snapshot(&self) -> &T {
        &self.snapshot
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Snapshot history with a linear timeline and a staged provisional state.
///
/// Edits arrive on two paths. [`commit`](History::commit) appends a new
/// labeled entry after the cursor and prunes any redo branch. While a
/// gesture is in flight, [`overwrite`](History::overwrite) stages a
/// provisional snapshot instead: readers see it through
/// [`current`](History::current) immediately, but no entry exists until a
/// commit lands. A drag therefore overwrites on every pointer move and
/// commits once on release, costing one entry no matter how many move
/// events arrived.
#[derive(Debug, Clone)]
pub struct History<T> {
    entries: Vec<HistoryEntry<T>>,
    cursor: usize,
    staged: Option<T>,
}

impl<T: Clone + PartialEq> History<T> {
    pub fn new(initial: T) -> Self {
        Self {
            entries: vec![HistoryEntry {
                snapshot: initial,
                label: "Initial".to_owned(),
            }],
            cursor: 0,
            staged: None,
        }
    }

    /// The latest snapshot: the staged provisional state if one exists,
    /// otherwise the committed entry at the cursor.
    pub fn current(&self) -> &T {
        self.staged
            .as_ref()
            .unwrap_or(&self.entries[self.cursor].snapshot)
    }

    /// Stages a provisional snapshot without creating an entry. Successive
    /// overwrites replace each other; the next commit or undo resolves
    /// them.
    pub fn overwrite(&mut self, snapshot: T) {
        self.staged = Some(snapshot);
    }

    /// Commits a snapshot as a new labeled entry, pruning any redo entries
    /// past the cursor and clearing the staged state.
    ///
    /// A snapshot equal to the committed entry at the cursor is a no-op:
    /// history does not grow and `false` is returned.
    pub fn commit(&mut self, snapshot: T, label: impl Into<String>) -> bool {
        if self.entries[self.cursor].snapshot == snapshot {
            self.staged = None;
            return false;
        }
        self.entries.truncate(self.cursor + 1);
        self.entries.push(HistoryEntry {
            snapshot,
            label: label.into(),
        });
        self.cursor += 1;
        self.staged = None;
        true
    }

    /// Steps back one entry, discarding any staged state, and returns the
    /// label of the entry being undone. `None` when already at the start.
    pub fn undo(&mut self) -> Option<String> {
        if self.cursor == 0 {
            return None;
        }
        let label = self.entries[self.cursor].label.clone();
        self.staged = None;
        self.cursor -= 1;
        Some(label)
    }

    /// Steps forward one entry, discarding any staged state, and returns
    /// the label of the entry being re-applied. `None` when already at the
    /// end.
    pub fn redo(&mut self) -> Option<String> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.staged = None;
        self.cursor += 1;
        Some(self.entries[self.cursor].label.clone())
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// Number of committed entries, the seed entry included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}
