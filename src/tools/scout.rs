//! `codebase_scout`: search the codebase through a [`SemanticSearch`] backend.
//!
//! The backend is an external collaborator (a vector store, an embedding
//! service, ...). [`LexicalIndex`] is a small in-process stand-in that ranks
//! chunks by query-term frequency, for setups without one.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::schema::ToolSchema;
use super::tool::Tool;
use super::types::{ToolInvocation, ToolKind, ToolResult};
use crate::error::ToolwireError;

/// Hits returned per query.
pub const SCOUT_RESULT_LIMIT: usize = 3;

/// One retrieved document chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub text: String,
    pub path: String,
}

impl SearchHit {
    pub fn new(text: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            path: path.into(),
        }
    }
}

/// Free-text search over an indexed codebase.
#[async_trait]
pub trait SemanticSearch: Send + Sync {
    /// Number of indexed documents.
    async fn document_count(&self) -> Result<usize, ToolwireError>;

    /// Index the files under `root`, returning how many documents were added.
    async fn index(&self, root: &Path) -> Result<usize, ToolwireError>;

    /// Up to `limit` hits, best first.
    async fn query(&self, text: &str, limit: usize) -> Result<Vec<SearchHit>, ToolwireError>;
}

/// When the scout asks its backend to index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexPolicy {
    /// Index the invocation's `cwd` once if the backend is empty.
    #[default]
    IndexOnFirstUse,
    /// Never index; the backend is filled elsewhere.
    Prepopulated,
}

/// Semantic code search tool.
///
/// Reads only the `query` parameter; other keys are ignored.
pub struct CodebaseScout {
    search: Option<Arc<dyn SemanticSearch>>,
    policy: IndexPolicy,
    indexed: Mutex<bool>,
    schema: ToolSchema,
}

impl CodebaseScout {
    pub fn new(search: Arc<dyn SemanticSearch>, policy: IndexPolicy) -> Self {
        Self::with_backend(Some(search), policy)
    }

    /// A scout with no backend; every search fails with an error result.
    pub fn unavailable() -> Self {
        Self::with_backend(None, IndexPolicy::Prepopulated)
    }

    fn with_backend(search: Option<Arc<dyn SemanticSearch>>, policy: IndexPolicy) -> Self {
        Self {
            search,
            policy,
            indexed: Mutex::new(false),
            schema: ToolSchema::object()
                .string("query", "The natural language search query", true)
                .build(),
        }
    }

    pub fn policy(&self) -> IndexPolicy {
        self.policy
    }

    async fn ensure_indexed(
        &self,
        search: &dyn SemanticSearch,
        root: &Path,
    ) -> Result<(), ToolwireError> {
        if self.policy == IndexPolicy::Prepopulated {
            return Ok(());
        }
        let mut indexed = self.indexed.lock().await;
        if *indexed {
            return Ok(());
        }
        if search.document_count().await? == 0 {
            let added = search.index(root).await?;
            debug!(tool = "codebase_scout", root = %root.display(), added, "indexed codebase");
        }
        *indexed = true;
        Ok(())
    }

    async fn run_search(&self, invocation: &ToolInvocation, query: &str) -> Result<String, ToolwireError> {
        let search = self.search.as_deref().ok_or_else(|| {
            ToolwireError::SearchUnavailable("no search backend configured".into())
        })?;
        self.ensure_indexed(search, &invocation.cwd).await?;
        let hits = search.query(query, SCOUT_RESULT_LIMIT).await?;
        Ok(format_hits(query, &hits))
    }
}

impl std::fmt::Debug for CodebaseScout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodebaseScout")
            .field("available", &self.search.is_some())
            .field("policy", &self.policy)
            .finish()
    }
}

#[async_trait]
impl Tool for CodebaseScout {
    fn name(&self) -> &str {
        "codebase_scout"
    }

    fn description(&self) -> &str {
        "Search the codebase semantically for code relevant to a natural language query."
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Read
    }

    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    async fn execute(&self, invocation: &ToolInvocation) -> ToolResult {
        let query = invocation
            .args()
            .get_str_opt("query")
            .map(str::trim)
            .filter(|q| !q.is_empty());
        let Some(query) = query else {
            return ToolResult::error_result("No query provided.");
        };

        match self.run_search(invocation, query).await {
            Ok(output) => ToolResult::success_result(output),
            Err(e) => {
                warn!(tool = "codebase_scout", error = %e, "search failed");
                ToolResult::error_result(format!("Search failed: {e}"))
            }
        }
    }
}

fn format_hits(query: &str, hits: &[SearchHit]) -> String {
    let mut output = format!("Search results for '{query}':\n\n");
    if hits.is_empty() {
        output.push_str("No relevant code found.");
        return output;
    }
    for (n, hit) in hits.iter().enumerate() {
        output.push_str(&format!(
            "--- Match {} (File: {}) ---\n{}\n\n",
            n + 1,
            hit.path,
            hit.text
        ));
    }
    output
}

// ── LexicalIndex ────────────────────────────────────────────────────────

const CHUNK_CHARS: usize = 1000;
const DEFAULT_EXTENSIONS: &[&str] = &["rs", "py", "md", "toml"];
const SKIPPED_DIRS: &[&str] = &["target", "node_modules", "venv", "__pycache__"];

#[derive(Debug, Clone)]
struct Chunk {
    path: String,
    text: String,
    lowered: String,
}

/// In-memory index ranking chunks by how often the query's terms occur.
#[derive(Debug)]
pub struct LexicalIndex {
    extensions: Vec<String>,
    chunks: RwLock<Vec<Chunk>>,
}

impl LexicalIndex {
    pub fn new() -> Self {
        Self::with_extensions(DEFAULT_EXTENSIONS.iter().copied())
    }

    /// Index only files with these extensions.
    pub fn with_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extensions: extensions.into_iter().map(Into::into).collect(),
            chunks: RwLock::new(Vec::new()),
        }
    }

    /// Add one document, split into line-aligned chunks.
    pub fn add_document(&self, path: impl Into<String>, content: &str) -> usize {
        let path = path.into();
        let chunks: Vec<Chunk> = split_lines(content, CHUNK_CHARS)
            .into_iter()
            .filter(|text| !text.trim().is_empty())
            .map(|text| Chunk {
                path: path.clone(),
                lowered: text.to_lowercase(),
                text,
            })
            .collect();
        let added = chunks.len();
        self.chunks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .extend(chunks);
        added
    }

    fn wants(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|wanted| wanted == ext))
    }
}

impl Default for LexicalIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SemanticSearch for LexicalIndex {
    async fn document_count(&self) -> Result<usize, ToolwireError> {
        Ok(self.chunks.read().unwrap_or_else(|e| e.into_inner()).len())
    }

    async fn index(&self, root: &Path) -> Result<usize, ToolwireError> {
        let root_owned = root.to_path_buf();
        let files = tokio::task::spawn_blocking(move || collect_files(&root_owned))
            .await
            .map_err(|e| ToolwireError::SearchUnavailable(format!("indexing task failed: {e}")))??;

        let mut added = 0;
        for path in files.into_iter().filter(|path| self.wants(path)) {
            // unreadable or non-UTF-8 files are skipped
            let Ok(content) = tokio::fs::read_to_string(&path).await else {
                continue;
            };
            let shown = path.strip_prefix(root).unwrap_or(path.as_path()).display().to_string();
            added += self.add_document(shown, &content);
        }
        Ok(added)
    }

    async fn query(&self, text: &str, limit: usize) -> Result<Vec<SearchHit>, ToolwireError> {
        let terms = query_terms(text);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let chunks = self.chunks.read().unwrap_or_else(|e| e.into_inner());
        let mut scored: Vec<(usize, &Chunk)> = chunks
            .iter()
            .map(|chunk| {
                let score = terms.iter().map(|term| chunk.lowered.matches(term.as_str()).count()).sum();
                (score, chunk)
            })
            .filter(|(score, _)| *score > 0)
            .collect();
        // stable sort keeps document order among equal scores
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, chunk)| SearchHit::new(chunk.text.clone(), chunk.path.clone()))
            .collect())
    }
}

fn query_terms(text: &str) -> Vec<String> {
    let mut terms: Vec<String> = text
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|term| term.chars().count() >= 2)
        .map(str::to_lowercase)
        .collect();
    terms.sort();
    terms.dedup();
    terms
}

/// Split on line boundaries, closing a chunk once it exceeds `max_chars`.
fn split_lines(content: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut size = 0;
    for line in content.split('\n') {
        current.push(line);
        size += line.chars().count();
        if size > max_chars {
            chunks.push(current.join("\n"));
            current.clear();
            size = 0;
        }
    }
    if !current.is_empty() {
        chunks.push(current.join("\n"));
    }
    chunks
}

/// Files under `root`, sorted, skipping hidden and build directories.
fn collect_files(root: &Path) -> Result<Vec<PathBuf>, ToolwireError> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                if !name.starts_with('.') && !SKIPPED_DIRS.contains(&name.as_ref()) {
                    pending.push(entry.path());
                }
            } else if file_type.is_file() {
                files.push(entry.path());
            }
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn formats_numbered_matches() {
        let hits = vec![
            SearchHit::new("fn main() {}", "src/main.rs"),
            SearchHit::new("# Readme", "README.md"),
        ];
        assert_eq!(
            format_hits("entry point", &hits),
            "Search results for 'entry point':\n\n\
             --- Match 1 (File: src/main.rs) ---\nfn main() {}\n\n\
             --- Match 2 (File: README.md) ---\n# Readme\n\n"
        );
    }

    #[test]
    fn formats_empty_results() {
        assert_eq!(
            format_hits("nothing", &[]),
            "Search results for 'nothing':\n\nNo relevant code found."
        );
    }

    #[test]
    fn splitter_keeps_lines_whole() {
        let content = format!("{}\n{}\nshort", "a".repeat(6), "b".repeat(6));
        assert_eq!(
            split_lines(&content, 10),
            vec![format!("{}\n{}", "a".repeat(6), "b".repeat(6)), "short".to_string()]
        );
    }

    #[tokio::test]
    async fn lexical_index_ranks_by_term_frequency() {
        let index = LexicalIndex::new();
        index.add_document("a.rs", "fn parse() {}");
        index.add_document("b.rs", "fn parse() { parse_inner(); parse_more(); }");
        index.add_document("c.rs", "fn unrelated() {}");

        let hits = index.query("where is Parse?", 3).await.unwrap();
        let paths: Vec<&str> = hits.iter().map(|hit| hit.path.as_str()).collect();
        assert_eq!(paths, vec!["b.rs", "a.rs"]);
    }

    #[tokio::test]
    async fn lexical_index_walks_wanted_files_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::create_dir_all(dir.path().join("target")).unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join("src/lib.rs"), "pub fn scout() {}").unwrap();
        std::fs::write(dir.path().join("target/gen.rs"), "pub fn scout() {}").unwrap();
        std::fs::write(dir.path().join(".git/config.toml"), "scout = 1").unwrap();
        std::fs::write(dir.path().join("image.png"), "scout").unwrap();

        let index = LexicalIndex::new();
        assert_eq!(index.index(dir.path()).await.unwrap(), 1);
        let hits = index.query("scout", 3).await.unwrap();
        assert_eq!(hits, vec![SearchHit::new("pub fn scout() {}", format!("src{}lib.rs", std::path::MAIN_SEPARATOR))]);
    }
}
