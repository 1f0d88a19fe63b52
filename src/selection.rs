//! Directory-tree selection model.
//!
//! Lines of the digest tree can be toggled on and off. Every toggled path is
//! collected, in toggle order, into a single comma-separated pattern. The
//! pattern text does not depend on the mode; the mode only decides whether
//! the server treats it as an exclude or include list, and which lines are
//! shown struck through.

use tracing::debug;

use crate::domain::PatternMode;

/// Header line of the tree text. Never selectable.
pub const TREE_HEADER: &str = "Directory structure:";

/// Separator used when joining selected paths into a pattern.
pub const PATTERN_SEPARATOR: &str = ", ";

/// A line of tree text paired with its selection key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeLine<'a> {
    pub text: &'a str,
    /// `None` for the header and for lines without any path characters.
    pub path: Option<&'a str>,
    pub deselected: bool,
}

impl TreeLine<'_> {
    /// Whether the line renders struck through under `mode`.
    ///
    /// In exclude mode the toggled lines are struck; include mode flips the
    /// polarity for every selectable line.
    pub fn is_struck(&self, mode: PatternMode) -> bool {
        if self.path.is_none() {
            return false;
        }
        self.deselected ^ (mode == PatternMode::Include)
    }
}

/// Strip decorative tree markup and return the bare path of a line.
pub fn bare_path(line: &str) -> Option<&str> {
    if line.contains(TREE_HEADER) {
        return None;
    }
    let start = line.find(|c: char| c.is_ascii_alphanumeric())?;
    let path = line[start..].trim();
    if path.is_empty() {
        None
    } else {
        Some(path)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TreeSelection {
    tree: String,
    mode: PatternMode,
    deselected: Vec<String>,
}

impl TreeSelection {
    pub fn new(tree: impl Into<String>, mode: PatternMode) -> Self {
        Self {
            tree: tree.into(),
            mode,
            deselected: Vec::new(),
        }
    }

    /// Replace the tree. Keys from the previous tree are dropped.
    pub fn reset(&mut self, tree: impl Into<String>) {
        self.tree = tree.into();
        self.deselected.clear();
    }

    pub fn tree(&self) -> &str {
        &self.tree
    }

    pub fn mode(&self) -> PatternMode {
        self.mode
    }

    /// Re-label the current selection. The selected paths are kept as-is.
    pub fn set_mode(&mut self, mode: PatternMode) {
        self.mode = mode;
    }

    /// Flip the selection of the path on `line`.
    ///
    /// Returns `false` when the line carries no selectable path.
    pub fn toggle(&mut self, line: &str) -> bool {
        let Some(path) = bare_path(line) else {
            return false;
        };

        if let Some(idx) = self.deselected.iter().position(|p| p == path) {
            self.deselected.remove(idx);
            debug!("Selection: restored '{}'", path);
        } else {
            self.deselected.push(path.to_string());
            debug!("Selection: toggled '{}'", path);
        }
        true
    }

    /// Toggle the line at `index` (0-based, header included).
    pub fn toggle_index(&mut self, index: usize) -> bool {
        let Some(line) = self.tree.lines().nth(index).map(str::to_string) else {
            return false;
        };
        self.toggle(&line)
    }

    pub fn is_deselected(&self, path: &str) -> bool {
        self.deselected.iter().any(|p| p == path)
    }

    /// Toggled paths in toggle order.
    pub fn deselected_paths(&self) -> &[String] {
        &self.deselected
    }

    pub fn pattern(&self) -> String {
        self.deselected.join(PATTERN_SEPARATOR)
    }

    pub fn lines(&self) -> Vec<TreeLine<'_>> {
        self.tree
            .lines()
            .map(|text| {
                let path = bare_path(text);
                TreeLine {
                    text,
                    path,
                    deselected: path.is_some_and(|p| self.is_deselected(p)),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TREE: &str = "Directory structure:\n├── a.py\n└── b.py";

    #[test]
    fn test_bare_path_strips_markup() {
        assert_eq!(bare_path("├── a.py"), Some("a.py"));
        assert_eq!(bare_path("│   └── src/lib.rs  "), Some("src/lib.rs"));
        assert_eq!(bare_path("    └── .github/"), Some("github/"));
        assert_eq!(bare_path("└── "), None);
        assert_eq!(bare_path(""), None);
        assert_eq!(bare_path("Directory structure:"), None);
    }

    #[test]
    fn test_toggle_builds_pattern_in_order() {
        let mut sel = TreeSelection::new(TREE, PatternMode::Exclude);
        assert!(sel.toggle("├── a.py"));
        assert_eq!(sel.pattern(), "a.py");
        assert!(sel.toggle("└── b.py"));
        assert_eq!(sel.pattern(), "a.py, b.py");
    }

    #[test]
    fn test_double_toggle_restores_state() {
        let mut sel = TreeSelection::new(TREE, PatternMode::Exclude);
        sel.toggle("├── a.py");
        let before = (sel.deselected_paths().to_vec(), sel.pattern());

        sel.toggle("└── b.py");
        sel.toggle("└── b.py");
        assert_eq!((sel.deselected_paths().to_vec(), sel.pattern()), before);
    }

    #[test]
    fn test_header_never_selected() {
        let mut sel = TreeSelection::new(TREE, PatternMode::Exclude);
        for _ in 0..3 {
            assert!(!sel.toggle("Directory structure:"));
            assert!(!sel.toggle_index(0));
        }
        assert!(sel.deselected_paths().is_empty());
        assert_eq!(sel.pattern(), "");
    }

    #[test]
    fn test_set_mode_keeps_selection() {
        let mut sel = TreeSelection::new(TREE, PatternMode::Exclude);
        sel.toggle("├── a.py");
        sel.set_mode(PatternMode::Include);
        assert_eq!(sel.mode(), PatternMode::Include);
        assert_eq!(sel.pattern(), "a.py");
    }

    #[test]
    fn test_strike_polarity_follows_mode() {
        let mut sel = TreeSelection::new(TREE, PatternMode::Exclude);
        sel.toggle_index(1);

        let lines = sel.lines();
        assert_eq!(lines.len(), 3);
        assert!(!lines[0].is_struck(PatternMode::Exclude));
        assert!(!lines[0].is_struck(PatternMode::Include));
        assert!(lines[1].is_struck(PatternMode::Exclude));
        assert!(!lines[1].is_struck(PatternMode::Include));
        assert!(!lines[2].is_struck(PatternMode::Exclude));
        assert!(lines[2].is_struck(PatternMode::Include));
    }

    #[test]
    fn test_reset_drops_previous_keys() {
        let mut sel = TreeSelection::new(TREE, PatternMode::Exclude);
        sel.toggle("├── a.py");
        sel.reset("Directory structure:\n└── c.py");
        assert!(sel.deselected_paths().is_empty());
        assert_eq!(sel.pattern(), "");
        assert!(!sel.toggle_index(5));
    }
}
