//! # Patterns Module
//!
//! Summarizes the naming conventions of an export before reconciling it.
//!
//! Each filename is reduced to a shape by replacing variable parts with
//! placeholders, applied in this order:
//!
//! | Placeholder | Replaces                                   |
//! |-------------|--------------------------------------------|
//! | `<date>`    | `YYYY-MM-DD`                               |
//! | `<uuid>`    | 8-4-4-4-12 hex groups, any case            |
//! | `<base64>`  | runs of 20+ of `A-Za-z0-9+/=_-`            |
//! | `<num>`     | any remaining digit run                    |
//!
//! The extension is kept verbatim. Shapes are collected per directory so
//! a new export format shows up as a new line, not as thousands of files.
//!
//! ## Example
//! ```rust,ignore
//! let tree = PatternAnalyzer::new().max_depth(2).analyze("/tmp/export".as_ref())?;
//! print!("{}", tree);
//! ```

use crate::core::inventory::InventoryBuilder;
use crate::error::InventoryError;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;
use tracing::info;

fn placeholders() -> &'static [(Regex, &'static str)] {
    static PLACEHOLDERS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PLACEHOLDERS.get_or_init(|| {
        [
            (r"\d{4}-\d{2}-\d{2}", "<date>"),
            (
                r"(?i)[0-9A-F]{8}-[0-9A-F]{4}-[0-9A-F]{4}-[0-9A-F]{4}-[0-9A-F]{12}",
                "<uuid>",
            ),
            (r"[A-Za-z0-9+/=_-]{20,}", "<base64>"),
            (r"\d+", "<num>"),
        ]
        .into_iter()
        .map(|(pattern, placeholder)| {
            // Patterns are fixed literals covered by tests
            let re = Regex::new(pattern).unwrap_or_else(|e| panic!("bad {placeholder}: {e}"));
            (re, placeholder)
        })
        .collect()
    })
}

/// Reduce a filename to its naming shape
pub fn reduce(filename: &str) -> String {
    let (stem, extension) = match filename.rfind('.') {
        Some(idx) if idx > 0 => filename.split_at(idx),
        _ => (filename, ""),
    };

    let shape = placeholders()
        .iter()
        .fold(stem.to_string(), |shape, (re, placeholder)| {
            re.replace_all(&shape, *placeholder).into_owned()
        });
    format!("{}{}", shape, extension)
}

fn is_hidden(component: Component<'_>) -> bool {
    component.as_os_str().to_string_lossy().starts_with('.')
}

/// Naming shapes per directory, relative to the analyzed root
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternTree {
    /// Final component of the analyzed root
    pub root_name: String,
    /// Directory (empty for the root) to the shapes of its files
    pub directories: BTreeMap<PathBuf, BTreeSet<String>>,
}

impl PatternTree {
    /// Number of distinct shapes across every directory
    pub fn shape_count(&self) -> usize {
        self.directories.values().map(BTreeSet::len).sum()
    }
}

impl fmt::Display for PatternTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}/", self.root_name)?;

        let count = self.directories.len();
        for (idx, (dir, shapes)) in self.directories.iter().enumerate() {
            let last_dir = idx + 1 == count;
            let indent = if dir.as_os_str().is_empty() {
                ""
            } else {
                writeln!(
                    f,
                    "{}{}/",
                    if last_dir { "└── " } else { "├── " },
                    dir.display()
                )?;
                if last_dir {
                    "    "
                } else {
                    "│   "
                }
            };

            for (shape_idx, shape) in shapes.iter().enumerate() {
                let branch = if shape_idx + 1 == shapes.len() {
                    "└── "
                } else {
                    "├── "
                };
                writeln!(f, "{}{}{}", indent, branch, shape)?;
            }
        }
        Ok(())
    }
}

/// Collects naming shapes under an export root
#[derive(Debug, Clone, Default)]
pub struct PatternAnalyzer {
    max_depth: Option<usize>,
}

impl PatternAnalyzer {
    /// Analyzer that walks the whole tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Only descend `depth` directories below the root. Zero analyzes nothing.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Walk `root` and group the shapes of every visible file by directory.
    ///
    /// Hidden files and anything under a hidden directory are skipped.
    pub fn analyze(&self, root: &Path) -> Result<PatternTree, InventoryError> {
        let mut tree = PatternTree {
            root_name: root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| root.display().to_string()),
            directories: BTreeMap::new(),
        };
        if self.max_depth == Some(0) {
            return Ok(tree);
        }

        let mut builder = InventoryBuilder::new();
        if let Some(depth) = self.max_depth {
            // Files sit one level below their directory
            builder = builder.max_depth(depth + 1);
        }
        let inventory = builder.build(root)?;

        for record in inventory.records.values() {
            let Ok(relative) = record.path.strip_prefix(root) else {
                continue;
            };
            if relative.components().any(is_hidden) {
                continue;
            }
            let dir = relative.parent().map(Path::to_path_buf).unwrap_or_default();
            tree.directories
                .entry(dir)
                .or_default()
                .insert(reduce(&record.raw_filename));
        }

        info!(
            directories = tree.directories.len(),
            shapes = tree.shape_count(),
            "pattern analysis complete"
        );
        Ok(tree)
    }
}
