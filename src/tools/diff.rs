//! Unified diffs of single-file changes.

use std::borrow::Cow;
use std::path::PathBuf;

use similar::TextDiff;

const NULL_DEVICE: &str = "/dev/null";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    Modified,
    Created,
    Deleted,
}

/// A textual change to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: PathBuf,
    pub old_content: String,
    pub new_content: String,
    change: Change,
}

impl FileDiff {
    pub fn modified(
        path: impl Into<PathBuf>,
        old_content: impl Into<String>,
        new_content: impl Into<String>,
    ) -> Self {
        Self::with_change(path, old_content.into(), new_content.into(), Change::Modified)
    }

    pub fn new_file(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self::with_change(path, String::new(), content.into(), Change::Created)
    }

    pub fn deletion(path: impl Into<PathBuf>, old_content: impl Into<String>) -> Self {
        Self::with_change(path, old_content.into(), String::new(), Change::Deleted)
    }

    fn with_change(
        path: impl Into<PathBuf>,
        old_content: String,
        new_content: String,
        change: Change,
    ) -> Self {
        Self {
            path: path.into(),
            old_content,
            new_content,
            change,
        }
    }

    pub fn is_new_file(&self) -> bool {
        self.change == Change::Created
    }

    pub fn is_deletion(&self) -> bool {
        self.change == Change::Deleted
    }

    /// Render as a unified diff with three lines of context.
    ///
    /// Returns an empty string when the contents are equal.
    pub fn to_diff(&self) -> String {
        let old = with_final_newline(&self.old_content);
        let new = with_final_newline(&self.new_content);
        let path = self.path.display().to_string();
        let old_name = if self.is_new_file() { NULL_DEVICE } else { path.as_str() };
        let new_name = if self.is_deletion() { NULL_DEVICE } else { path.as_str() };

        TextDiff::from_lines(old.as_ref(), new.as_ref())
            .unified_diff()
            .context_radius(3)
            .header(old_name, new_name)
            .to_string()
    }
}

fn with_final_newline(text: &str) -> Cow<'_, str> {
    if text.is_empty() || text.ends_with('\n') {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(format!("{text}\n"))
    }
}
