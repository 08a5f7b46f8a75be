//! Locating native session transcripts on disk.

use std::path::{Path, PathBuf};

/// Convert a project path to the directory name used by Claude Code.
///
/// Claude Code stores sessions in `~/.claude/projects/<hash>/` where
/// the hash is the project path with `/` replaced by `-`.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use cli_relay::history::project_path_hash;
///
/// let hash = project_path_hash(Path::new("/home/user/project"));
/// assert_eq!(hash, "-home-user-project");
/// ```
#[must_use]
pub fn project_path_hash(project_path: &Path) -> String {
    project_path.to_string_lossy().replace('/', "-")
}

/// `~/.claude/projects`, if the home directory is known.
#[must_use]
pub fn claude_projects_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".claude").join("projects"))
}

/// Directory holding the transcripts of one project.
#[must_use]
pub fn project_sessions_dir(projects_root: &Path, project_path: &Path) -> PathBuf {
    projects_root.join(project_path_hash(project_path))
}

/// `.jsonl` files in `dir`, most recently modified first.
///
/// A missing or unreadable directory yields an empty list.
pub async fn session_files_newest_first(dir: &Path) -> Vec<PathBuf> {
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        tracing::debug!(dir = %dir.display(), "No session directory");
        return Vec::new();
    };

    let mut files = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if !path.extension().is_some_and(|ext| ext == "jsonl") {
            continue;
        }
        let Ok(metadata) = entry.metadata().await else {
            continue;
        };
        let Ok(modified) = metadata.modified() else {
            continue;
        };
        files.push((path, modified));
    }

    files.sort_by(|a, b| b.1.cmp(&a.1));
    files.into_iter().map(|(path, _)| path).collect()
}
