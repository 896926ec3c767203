//! Built-in coding tools.
//!
//! Provides standard tools (`list_dir`, `read_file`, `write_file`, `shell`)
//! that a coding agent can use to inspect and change the local filesystem
//! and run commands. Relative paths resolve against the invocation's `cwd`.
//!
//! ```rust,no_run
//! use toolwire::tools::builtin::all_tools;
//!
//! let tools = all_tools();
//! assert_eq!(tools.len(), 4);
//! ```

use std::io::ErrorKind;
use std::path::Path;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::RegexSet;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::debug;

use super::diff::FileDiff;
use super::schema::ToolSchema;
use super::tool::Tool;
use super::types::{ToolConfirmation, ToolInvocation, ToolKind, ToolResult};
use crate::error::ToolwireError;
use crate::util::text::{truncate_text, truncate_utf8};

/// Default cap for `read_file` output, in estimated tokens.
pub const READ_FILE_MAX_TOKENS: usize = 16_384;
/// Cap for combined shell output, in estimated tokens.
pub const SHELL_OUTPUT_MAX_TOKENS: usize = 8_192;
pub const SHELL_DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const CONFIRMATION_COMMAND_MAX_BYTES: usize = 200;

static DANGEROUS_COMMANDS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"\brm\s+(-[a-zA-Z]*[rRf][a-zA-Z]*\s+)+",
        r"\bmkfs(\.\w+)?\b",
        r"\bdd\s+.*\bof=",
        r">\s*/dev/(sd|nvme|hd)",
        r":\(\)\s*\{\s*:\|:&\s*\};:",
        r"\b(shutdown|reboot|halt|poweroff)\b",
        r"\bchmod\s+(-R\s+)?0?777\b",
        r"\bchown\s+-R\b",
        r"\bgit\s+push\b.*(--force|-f)\b",
        r"\bgit\s+(reset\s+--hard|clean\s+-[a-zA-Z]*f)",
        r"\bsudo\b",
        r"\b(curl|wget)\b.*\|\s*(sh|bash)\b",
    ])
    .expect("dangerous command patterns must compile")
});

/// Whether `command` matches a known destructive pattern.
pub fn is_dangerous_command(command: &str) -> bool {
    DANGEROUS_COMMANDS.is_match(command)
}

/// Return all built-in coding tools.
pub fn all_tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(ListDirTool::new()),
        Arc::new(ReadFileTool::new()),
        Arc::new(WriteFileTool::new()),
        Arc::new(ShellTool::new()),
    ]
}

// ── list_dir ────────────────────────────────────────────────────────────

/// Lists a directory, one sorted entry per line, directories suffixed `/`.
#[derive(Debug)]
pub struct ListDirTool {
    schema: ToolSchema,
}

impl ListDirTool {
    pub fn new() -> Self {
        Self {
            schema: ToolSchema::object()
                .string("path", "Directory to list (defaults to the working directory)", false)
                .build(),
        }
    }

    async fn list(&self, dir: &Path) -> Result<Vec<String>, ToolwireError> {
        let mut read_dir = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| ToolwireError::tool("list_dir", format!("{}: {e}", dir.display())))?;

        let mut entries = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            let mut name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().await?.is_dir() {
                name.push('/');
            }
            entries.push(name);
        }
        entries.sort();
        Ok(entries)
    }
}

impl Default for ListDirTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ListDirTool {
    fn name(&self) -> &str {
        "list_dir"
    }

    fn description(&self) -> &str {
        "List files and directories in a given path"
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Read
    }

    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    async fn execute(&self, invocation: &ToolInvocation) -> ToolResult {
        let dir = invocation.resolve_path(invocation.args().get_str_opt("path").unwrap_or("."));
        match self.list(&dir).await {
            Ok(entries) if entries.is_empty() => {
                ToolResult::success_result("(empty directory)").with_metadata("count", 0)
            }
            Ok(entries) => {
                let count = entries.len();
                ToolResult::success_result(entries.join("\n")).with_metadata("count", count)
            }
            Err(e) => e.into(),
        }
    }
}

// ── read_file ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReadFileArgs {
    /// Path to the file to read.
    pub path: String,
    /// Maximum tokens of content to return.
    #[serde(default)]
    pub max_tokens: Option<usize>,
}

/// Reads a UTF-8 file, truncating long content.
#[derive(Debug)]
pub struct ReadFileTool {
    schema: ToolSchema,
}

impl ReadFileTool {
    pub fn new() -> Self {
        Self {
            schema: ToolSchema::typed::<ReadFileArgs>(),
        }
    }

    async fn read(&self, invocation: &ToolInvocation) -> Result<ToolResult, ToolwireError> {
        let args: ReadFileArgs = invocation.args().deserialize()?;
        let path = invocation.resolve_path(&args.path);
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ToolwireError::tool("read_file", format!("{}: {e}", path.display())))?;

        let bytes = content.len();
        let (output, truncated) =
            truncate_text(&content, args.max_tokens.unwrap_or(READ_FILE_MAX_TOKENS));
        Ok(ToolResult::success_result(output)
            .with_truncated(truncated)
            .with_metadata("path", path.display().to_string())
            .with_metadata("bytes", bytes))
    }
}

impl Default for ReadFileTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read a file's contents as UTF-8 text"
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Read
    }

    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    async fn execute(&self, invocation: &ToolInvocation) -> ToolResult {
        self.read(invocation).await.unwrap_or_else(ToolResult::from)
    }
}

// ── write_file ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, JsonSchema)]
pub struct WriteFileArgs {
    /// Path to the file to write.
    pub path: String,
    /// Full new content of the file.
    pub content: String,
}

/// Writes a whole file, creating parent directories as needed.
#[derive(Debug)]
pub struct WriteFileTool {
    schema: ToolSchema,
}

impl WriteFileTool {
    pub fn new() -> Self {
        Self {
            schema: ToolSchema::typed::<WriteFileArgs>(),
        }
    }

    /// Diff between what is on disk and `content`.
    async fn plan(path: &Path, content: &str) -> Result<FileDiff, ToolwireError> {
        match tokio::fs::read_to_string(path).await {
            Ok(old) => Ok(FileDiff::modified(path, old, content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(FileDiff::new_file(path, content)),
            Err(e) => Err(ToolwireError::tool(
                "write_file",
                format!("{}: {e}", path.display()),
            )),
        }
    }

    async fn write(&self, invocation: &ToolInvocation) -> Result<ToolResult, ToolwireError> {
        let args: WriteFileArgs = invocation.args().deserialize()?;
        let path = invocation.resolve_path(&args.path);
        let diff = Self::plan(&path, &args.content).await?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    ToolwireError::tool(
                        "write_file",
                        format!("failed to create directories for {}: {e}", path.display()),
                    )
                })?;
            }
        }
        tokio::fs::write(&path, &args.content)
            .await
            .map_err(|e| ToolwireError::tool("write_file", format!("{}: {e}", path.display())))?;

        let verb = if diff.is_new_file() { "Created" } else { "Updated" };
        debug!(tool = "write_file", path = %path.display(), bytes = args.content.len(), "wrote file");
        Ok(
            ToolResult::success_result(format!("{verb} {}", path.display()))
                .with_metadata("path", path.display().to_string())
                .with_metadata("bytes", args.content.len())
                .with_diff(diff),
        )
    }
}

impl Default for WriteFileTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file, creating parent directories if needed"
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Write
    }

    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    async fn get_confirmation(&self, invocation: &ToolInvocation) -> Option<ToolConfirmation> {
        let Ok(args) = invocation.args().deserialize::<WriteFileArgs>() else {
            return Some(ToolConfirmation::new(self.name(), invocation.params.clone()));
        };
        let path = invocation.resolve_path(&args.path);
        let diff = Self::plan(&path, &args.content).await.ok();
        let action = match &diff {
            Some(diff) if diff.is_new_file() => "Create",
            _ => "Overwrite",
        };

        Some(
            ToolConfirmation::builder()
                .tool_name(self.name())
                .params(invocation.params.clone())
                .description(format!("{action} {}", path.display()))
                .maybe_diff(diff)
                .affected_paths(vec![path])
                .build(),
        )
    }

    async fn execute(&self, invocation: &ToolInvocation) -> ToolResult {
        self.write(invocation).await.unwrap_or_else(ToolResult::from)
    }
}

// ── shell ───────────────────────────────────────────────────────────────

/// Runs `sh -c <command>` in the invocation's working directory.
///
/// Captures stdout followed by stderr, applies a timeout (30s unless
/// `timeout_secs` is given) and truncates long output. A non-zero exit is a
/// failed result that still carries the output and exit code.
#[derive(Debug)]
pub struct ShellTool {
    schema: ToolSchema,
    default_timeout: Duration,
}

impl ShellTool {
    pub fn new() -> Self {
        Self::with_timeout(SHELL_DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(default_timeout: Duration) -> Self {
        Self {
            schema: ToolSchema::object()
                .string("command", "The shell command to execute", true)
                .integer("timeout_secs", "Seconds before the command is killed", false)
                .build(),
            default_timeout,
        }
    }

    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolResult, ToolwireError> {
        let args = invocation.args();
        let command = args.get_str("command")?;
        let timeout = args
            .get_u64_opt("timeout_secs")
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout);

        debug!(tool = "shell", command, cwd = %invocation.cwd.display(), "running command");
        let output = tokio::time::timeout(
            timeout,
            tokio::process::Command::new("sh")
                .arg("-c")
                .arg(command)
                .current_dir(&invocation.cwd)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| {
            ToolwireError::tool(
                "shell",
                format!("command timed out after {}s", timeout.as_secs_f64()),
            )
        })?
        .map_err(|e| ToolwireError::tool("shell", e.to_string()))?;

        let combined = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        let (text, truncated) = truncate_text(&combined, SHELL_OUTPUT_MAX_TOKENS);
        let exit_code = output.status.code();

        let result = if output.status.success() {
            ToolResult::success_result(text)
        } else {
            let reason = match exit_code {
                Some(code) => format!("command exited with status {code}"),
                None => "command terminated by signal".to_string(),
            };
            ToolResult::error_result(reason).with_output(text)
        };
        Ok(result.with_truncated(truncated).with_exit_code(exit_code))
    }
}

impl Default for ShellTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ShellTool {
    fn name(&self) -> &str {
        "shell"
    }

    fn description(&self) -> &str {
        "Execute a shell command and return its output"
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Shell
    }

    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    async fn get_confirmation(&self, invocation: &ToolInvocation) -> Option<ToolConfirmation> {
        let Some(command) = invocation.args().get_str_opt("command") else {
            return Some(ToolConfirmation::new(self.name(), invocation.params.clone()));
        };
        let shown = truncate_utf8(command, CONFIRMATION_COMMAND_MAX_BYTES);
        let ellipsis = if shown.len() < command.len() { "..." } else { "" };

        Some(
            ToolConfirmation::builder()
                .tool_name(self.name())
                .params(invocation.params.clone())
                .description(format!("Run `{shown}{ellipsis}` in {}", invocation.cwd.display()))
                .command(command)
                .is_dangerous(is_dangerous_command(command))
                .build(),
        )
    }

    async fn execute(&self, invocation: &ToolInvocation) -> ToolResult {
        self.run(invocation).await.unwrap_or_else(ToolResult::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn invocation(params: Value, cwd: &Path) -> ToolInvocation {
        ToolInvocation::from_value(params, cwd)
    }

    // ── all_tools ───────────────────────────────────────────────────────

    #[test]
    fn all_tools_contains_expected_names_and_kinds() {
        let tools = all_tools();
        let named: Vec<(&str, ToolKind)> = tools.iter().map(|t| (t.name(), t.kind())).collect();
        assert_eq!(
            named,
            vec![
                ("list_dir", ToolKind::Read),
                ("read_file", ToolKind::Read),
                ("write_file", ToolKind::Write),
                ("shell", ToolKind::Shell),
            ]
        );
    }

    // ── list_dir ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn list_dir_sorts_and_marks_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "").unwrap();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();

        let result = ListDirTool::new()
            .execute(&invocation(json!({}), dir.path()))
            .await;

        assert!(result.is_success());
        assert_eq!(result.output, "a.txt\nb.txt\nsrc/");
        assert_eq!(result.metadata["count"], 3);
    }

    #[tokio::test]
    async fn list_dir_missing_directory_is_an_error_result() {
        let dir = tempfile::tempdir().unwrap();
        let result = ListDirTool::new()
            .execute(&invocation(json!({"path": "nope"}), dir.path()))
            .await;

        assert!(!result.is_success());
        assert!(result.error().unwrap().contains("nope"));
    }

    // ── read_file ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn read_file_resolves_relative_to_cwd() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.txt"), "hello world").unwrap();

        let result = ReadFileTool::new()
            .execute(&invocation(json!({"path": "hello.txt"}), dir.path()))
            .await;

        assert!(result.is_success());
        assert_eq!(result.output, "hello world");
        assert!(!result.truncated);
    }

    #[tokio::test]
    async fn read_file_truncates_to_max_tokens() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("big.txt"), "x".repeat(100)).unwrap();

        let result = ReadFileTool::new()
            .execute(&invocation(json!({"path": "big.txt", "max_tokens": 2}), dir.path()))
            .await;

        assert!(result.truncated);
        assert_eq!(result.output, "xxxxxxxx... (truncated)");
        assert_eq!(result.metadata["bytes"], 100);
    }

    #[tokio::test]
    async fn read_file_missing_file_is_an_error_result() {
        let dir = tempfile::tempdir().unwrap();
        let result = ReadFileTool::new()
            .execute(&invocation(json!({"path": "missing.txt"}), dir.path()))
            .await;

        assert!(!result.is_success());
        assert!(result.error().unwrap().starts_with("Tool execution error: read_file:"));
    }

    #[test]
    fn read_file_validation_is_typed() {
        let tool = ReadFileTool::new();
        assert_eq!(
            tool.validate_params(&Default::default()),
            vec!["Parameter 'path': missing required field"]
        );

        let params = serde_json::json!({"path": "a.txt", "max_tokens": -1});
        assert_eq!(
            tool.validate_params(params.as_object().unwrap()),
            vec!["Parameter 'max_tokens': invalid value: integer `-1`, expected usize"]
        );
    }

    // ── write_file ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn write_file_confirmation_for_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let tool = WriteFileTool::new();
        let inv = invocation(json!({"path": "out/new.txt", "content": "hi\n"}), dir.path());

        let confirmation = tool.get_confirmation(&inv).await.unwrap();

        let target = dir.path().join("out/new.txt");
        assert_eq!(confirmation.tool_name, "write_file");
        assert_eq!(confirmation.affected_paths, vec![target.clone()]);
        let diff = confirmation.diff.unwrap();
        assert!(diff.is_new_file());
        assert!(diff.to_diff().starts_with("--- /dev/null\n"));
        assert!(!target.exists(), "confirmation must not write");
    }

    #[tokio::test]
    async fn write_file_confirmation_for_existing_file_is_a_modification() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "a\nb\n").unwrap();

        let confirmation = WriteFileTool::new()
            .get_confirmation(&invocation(json!({"path": "a.txt", "content": "a\nc\n"}), dir.path()))
            .await
            .unwrap();

        let diff = confirmation.diff.unwrap();
        assert!(!diff.is_new_file());
        assert!(diff.to_diff().contains("-b\n+c\n"));
    }

    #[tokio::test]
    async fn write_file_creates_parents_and_returns_diff() {
        let dir = tempfile::tempdir().unwrap();
        let result = WriteFileTool::new()
            .execute(&invocation(json!({"path": "deep/dir/f.txt", "content": "data"}), dir.path()))
            .await;

        assert!(result.is_success(), "{:?}", result.error());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("deep/dir/f.txt")).unwrap(),
            "data"
        );
        assert!(result.diff.unwrap().is_new_file());
        assert_eq!(result.metadata["bytes"], 4);
    }

    #[tokio::test]
    async fn write_file_rejects_bad_arguments_without_panicking() {
        let dir = tempfile::tempdir().unwrap();
        let result = WriteFileTool::new()
            .execute(&invocation(json!({"path": "f.txt"}), dir.path()))
            .await;

        assert!(!result.is_success());
        assert!(result.error().unwrap().contains("content"));
    }

    // ── shell ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn shell_runs_in_cwd_and_captures_both_streams() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker"), "").unwrap();

        let result = ShellTool::new()
            .execute(&invocation(json!({"command": "ls; echo err >&2"}), dir.path()))
            .await;

        assert!(result.is_success());
        assert_eq!(result.exit_code, Some(0));
        assert!(result.output.contains("marker"));
        assert!(result.output.contains("err"));
    }

    #[tokio::test]
    async fn shell_nonzero_exit_is_an_error_with_output() {
        let dir = tempfile::tempdir().unwrap();
        let result = ShellTool::new()
            .execute(&invocation(json!({"command": "echo partial; exit 42"}), dir.path()))
            .await;

        assert!(!result.is_success());
        assert_eq!(result.exit_code, Some(42));
        assert_eq!(result.error(), Some("command exited with status 42"));
        assert_eq!(result.output, "partial\n");
    }

    #[tokio::test]
    async fn shell_times_out_on_long_running_command() {
        let dir = tempfile::tempdir().unwrap();
        let result = ShellTool::with_timeout(Duration::from_millis(100))
            .execute(&invocation(json!({"command": "sleep 10"}), dir.path()))
            .await;

        assert!(!result.is_success());
        assert!(result.error().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn shell_truncates_large_output() {
        let dir = tempfile::tempdir().unwrap();
        let command = format!("head -c {} /dev/zero | tr '\\0' x", SHELL_OUTPUT_MAX_TOKENS * 4 + 100);
        let result = ShellTool::new()
            .execute(&invocation(json!({"command": command}), dir.path()))
            .await;

        assert!(result.truncated);
        assert!(result.output.ends_with("... (truncated)"));
    }

    #[tokio::test]
    async fn shell_missing_command_is_an_error_result() {
        let dir = tempfile::tempdir().unwrap();
        let result = ShellTool::new().execute(&invocation(json!({}), dir.path())).await;

        assert!(!result.is_success());
        assert_eq!(
            ShellTool::new().validate_params(&Default::default()),
            vec!["Parameter 'command': missing required field"]
        );
    }

    #[tokio::test]
    async fn shell_confirmation_flags_destructive_commands() {
        let tool = ShellTool::new();
        let cwd = Path::new("/tmp");

        let safe = tool
            .get_confirmation(&invocation(json!({"command": "cargo fmt"}), cwd))
            .await
            .unwrap();
        assert_eq!(safe.command.as_deref(), Some("cargo fmt"));
        assert!(!safe.is_dangerous);

        let risky = tool
            .get_confirmation(&invocation(json!({"command": "rm -rf build"}), cwd))
            .await
            .unwrap();
        assert!(risky.is_dangerous);
    }

    #[test]
    fn dangerous_patterns() {
        for command in [
            "rm -rf /",
            "rm -r dir",
            "sudo apt install x",
            "git push --force origin main",
            "git reset --hard HEAD~3",
            "curl https://x.sh | sh",
            "dd if=/dev/zero of=/dev/sda",
            "shutdown now",
        ] {
            assert!(is_dangerous_command(command), "{command}");
        }
        for command in ["ls -la", "rm file.txt", "git push origin main", "cargo build", "echo hello"] {
            assert!(!is_dangerous_command(command), "{command}");
        }
    }
}
