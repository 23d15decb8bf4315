use std::sync::Arc;
use parking_lot::RwLock;
use ahash::AHashSet;

/// How a batch of matched rows is merged into the selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOp {
    /// Selection becomes exactly the matched rows
    Replace,
    /// Matched rows are added
    Add,
    /// Matched rows are removed
    Remove,
    /// Matched rows flip their membership
    Toggle,
}

impl SelectionOp {
    /// Map the append/remove modifier pair onto a merge operation.
    ///
    /// Append alone adds, remove alone removes, both together toggle and
    /// neither replaces.
    pub fn from_modifiers(append: bool, remove: bool) -> Self {
        match (append, remove) {
            (false, false) => SelectionOp::Replace,
            (true, false) => SelectionOp::Add,
            (false, true) => SelectionOp::Remove,
            (true, true) => SelectionOp::Toggle,
        }
    }
}

/// Sorted, duplicate-free set of selected row indices
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    rows: Vec<usize>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: impl IntoIterator<Item = usize>) -> Self {
        Self { rows: normalized(rows) }
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, row: usize) -> bool {
        self.rows.binary_search(&row).is_ok()
    }

    /// Merge `matched` into the selection. Returns whether membership changed.
    pub fn apply(&mut self, matched: impl IntoIterator<Item = usize>, op: SelectionOp) -> bool {
        let matched = normalized(matched);
        let merged = match op {
            SelectionOp::Replace => matched,
            SelectionOp::Add => merge(&self.rows, &matched, true, true, true),
            SelectionOp::Remove => merge(&self.rows, &matched, true, false, false),
            SelectionOp::Toggle => merge(&self.rows, &matched, true, false, true),
        };
        if merged == self.rows {
            return false;
        }
        self.rows = merged;
        true
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.rows.is_empty();
        self.rows.clear();
        changed
    }
}

fn normalized(rows: impl IntoIterator<Item = usize>) -> Vec<usize> {
    let mut rows: Vec<usize> = rows.into_iter().collect();
    rows.sort_unstable();
    rows.dedup();
    rows
}

/// Merge two sorted, duplicate-free slices, keeping elements according to
/// which side(s) they occur on.
fn merge(a: &[usize], b: &[usize], only_a: bool, both: bool, only_b: bool) -> Vec<usize> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => {
                if only_a {
                    out.push(a[i]);
                }
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                if only_b {
                    out.push(b[j]);
                }
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                if both {
                    out.push(a[i]);
                }
                i += 1;
                j += 1;
            }
        }
    }
    if only_a {
        out.extend_from_slice(&a[i..]);
    }
    if only_b {
        out.extend_from_slice(&b[j..]);
    }
    out
}

/// Rows drawn with extra emphasis, independent of the selection
#[derive(Debug, Clone, Default)]
pub struct HighlightSet {
    rows: AHashSet<usize>,
}

impl HighlightSet {
    pub fn contains(&self, row: usize) -> bool {
        self.rows.contains(&row)
    }

    pub fn insert(&mut self, row: usize) -> bool {
        self.rows.insert(row)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Highlighted rows in ascending order
    pub fn sorted(&self) -> Vec<usize> {
        let mut rows: Vec<usize> = self.rows.iter().copied().collect();
        rows.sort_unstable();
        rows
    }
}

/// Current and previously hovered row
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HoverState {
    pub current: Option<usize>,
    pub previous: Option<usize>,
}

impl HoverState {
    /// Move to a new hovered row, keeping the old one as `previous`.
    /// Returns whether the current row changed.
    pub fn shift_to(&mut self, row: Option<usize>) -> bool {
        if self.current == row {
            return false;
        }
        self.previous = self.current;
        self.current = row;
        true
    }

    /// Forget both rows. Returns whether anything was set.
    pub fn clear(&mut self) -> bool {
        let changed = self.current.is_some() || self.previous.is_some();
        self.current = None;
        self.previous = None;
        changed
    }
}

/// Linked state shared by every plot of a matrix
pub struct SyncManager {
    /// Shared selection state
    selection: Arc<RwLock<SelectionSet>>,

    /// Shared highlight state
    highlight: Arc<RwLock<HighlightSet>>,

    /// Matrix-wide hover state
    hover: Arc<RwLock<HoverState>>,
}

impl SyncManager {
    pub fn new() -> Self {
        Self {
            selection: Arc::new(RwLock::new(SelectionSet::default())),
            highlight: Arc::new(RwLock::new(HighlightSet::default())),
            hover: Arc::new(RwLock::new(HoverState::default())),
        }
    }

    /// Snapshot of the selected rows
    pub fn selection(&self) -> Vec<usize> {
        self.selection.read().as_slice().to_vec()
    }

    pub fn selection_len(&self) -> usize {
        self.selection.read().len()
    }

    pub fn is_selected(&self, row: usize) -> bool {
        self.selection.read().contains(row)
    }

    /// Merge matched rows into the selection
    pub fn apply_selection(&self, matched: impl IntoIterator<Item = usize>, op: SelectionOp) -> bool {
        self.selection.write().apply(matched, op)
    }

    pub fn set_selection(&self, rows: impl IntoIterator<Item = usize>) -> bool {
        self.apply_selection(rows, SelectionOp::Replace)
    }

    pub fn clear_selection(&self) -> bool {
        self.selection.write().clear()
    }

    /// Snapshot of the highlighted rows, ascending
    pub fn highlighted(&self) -> Vec<usize> {
        self.highlight.read().sorted()
    }

    pub fn is_highlighted(&self, row: usize) -> bool {
        self.highlight.read().contains(row)
    }

    pub fn set_highlight(&self, rows: impl IntoIterator<Item = usize>) {
        let mut highlight = HighlightSet::default();
        for row in rows {
            highlight.insert(row);
        }
        *self.highlight.write() = highlight;
    }

    pub fn clear_highlight(&self) -> bool {
        let mut highlight = self.highlight.write();
        let changed = !highlight.is_empty();
        *highlight = HighlightSet::default();
        changed
    }

    pub fn hover(&self) -> HoverState {
        *self.hover.read()
    }

    pub fn set_hover(&self, row: Option<usize>) -> bool {
        self.hover.write().shift_to(row)
    }

    pub fn clear_hover(&self) -> bool {
        self.hover.write().clear()
    }

    /// Drop all linked state, e.g. when a new table is attached
    pub fn reset(&self) {
        self.selection.write().clear();
        *self.highlight.write() = HighlightSet::default();
        self.hover.write().clear();
    }
}

impl Default for SyncManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_ops() {
        let mut set = SelectionSet::from_rows([5, 1, 3, 3]);
        assert_eq!(set.as_slice(), &[1, 3, 5]);

        assert!(set.apply([4, 3], SelectionOp::Add));
        assert_eq!(set.as_slice(), &[1, 3, 4, 5]);

        assert!(set.apply([1, 2], SelectionOp::Remove));
        assert_eq!(set.as_slice(), &[3, 4, 5]);

        assert!(set.apply([5, 6], SelectionOp::Toggle));
        assert_eq!(set.as_slice(), &[3, 4, 6]);

        assert!(set.apply([9, 0], SelectionOp::Replace));
        assert_eq!(set.as_slice(), &[0, 9]);
    }

    #[test]
    fn test_append_is_idempotent() {
        let mut set = SelectionSet::from_rows([2]);
        assert!(set.apply([1, 2, 3], SelectionOp::Add));
        assert!(!set.apply([1, 2, 3], SelectionOp::Add));
        assert_eq!(set.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn test_toggle_is_self_inverse() {
        let mut set = SelectionSet::from_rows([1, 4, 7]);
        let before = set.clone();
        set.apply([0, 1, 2, 7, 8], SelectionOp::Toggle);
        assert_eq!(set.as_slice(), &[0, 2, 4, 8]);
        set.apply([0, 1, 2, 7, 8], SelectionOp::Toggle);
        assert_eq!(set, before);
    }

    #[test]
    fn test_remove_only_never_inserts() {
        let mut set = SelectionSet::new();
        assert!(!set.apply([1, 2], SelectionOp::Remove));
        assert!(set.is_empty());
    }

    #[test]
    fn test_modifier_mapping() {
        assert_eq!(SelectionOp::from_modifiers(false, false), SelectionOp::Replace);
        assert_eq!(SelectionOp::from_modifiers(true, false), SelectionOp::Add);
        assert_eq!(SelectionOp::from_modifiers(false, true), SelectionOp::Remove);
        assert_eq!(SelectionOp::from_modifiers(true, true), SelectionOp::Toggle);
    }

    #[test]
    fn test_hover_shift_and_clear() {
        let mut hover = HoverState::default();
        assert!(hover.shift_to(Some(3)));
        assert!(!hover.shift_to(Some(3)));
        assert!(hover.shift_to(Some(8)));
        assert_eq!(hover, HoverState { current: Some(8), previous: Some(3) });
        assert!(hover.clear());
        assert!(!hover.clear());
    }

    #[test]
    fn test_sync_manager_highlight() {
        let sync = SyncManager::new();
        sync.set_highlight([4, 2, 9, 2]);
        assert_eq!(sync.highlighted(), vec![2, 4, 9]);
        assert!(sync.is_highlighted(9));
        assert!(sync.clear_highlight());
        assert!(sync.highlighted().is_empty());
    }
}
