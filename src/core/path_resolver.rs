use super::models::{AccessContext, Project};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/*
 * This module turns an untrusted, request-supplied relative path into an
 * absolute path of a markdown file inside one of the project's permitted
 * roots. The path is normalized lexically first; containment is then checked
 * against canonical paths so that symlinks (including symlinked intermediate
 * directories) cannot lead outside the root.
 */

const MARKDOWN_EXTENSIONS: [&str; 2] = ["md", "markdown"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryReason {
    Escapes,
    Missing,
    NotAFile,
    NotMarkdown,
}

impl fmt::Display for BoundaryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryReason::Escapes => write!(f, "escapes the permitted roots"),
            BoundaryReason::Missing => write!(f, "does not exist under any permitted root"),
            BoundaryReason::NotAFile => write!(f, "is not a regular file"),
            BoundaryReason::NotMarkdown => write!(f, "is not a markdown file"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryError {
    pub requested: String,
    pub reason: BoundaryReason,
}

impl BoundaryError {
    fn new(requested: &str, reason: BoundaryReason) -> Self {
        BoundaryError {
            requested: requested.to_string(),
            reason,
        }
    }
}

impl fmt::Display for BoundaryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Requested path {:?} {}", self.requested, self.reason)
    }
}

impl std::error::Error for BoundaryError {}

pub type Result<T> = std::result::Result<T, BoundaryError>;

pub fn is_markdown_file_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_ascii_lowercase();
            MARKDOWN_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/*
 * Resolves `.` and `..` segments of a request path without touching the file
 * system. Both `/` and `\` count as separators. Absolute paths, drive
 * prefixes and any `..` that would climb above the root are rejected as
 * escapes. Returns the remaining segments.
 */
pub fn normalize_relative_path(raw: &str) -> std::result::Result<Vec<String>, BoundaryReason> {
    if raw.starts_with('/') || raw.starts_with('\\') || raw.contains('\0') {
        return Err(BoundaryReason::Escapes);
    }

    let mut segments: Vec<String> = Vec::new();
    for segment in raw.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(BoundaryReason::Escapes);
                }
            }
            other => {
                // Drive prefixes such as `C:` would make `join` discard the root.
                if other.contains(':') {
                    return Err(BoundaryReason::Escapes);
                }
                segments.push(other.to_string());
            }
        }
    }
    Ok(segments)
}

/*
 * Abstracts path resolution so the file manager can be tested with a resolver
 * that does not touch the disk.
 */
pub trait PathResolverOperations: Send + Sync {
    /*
     * Returns the canonical absolute path of the markdown file `relative_path`
     * under the first permitted root (for `access`) that contains it as a
     * regular file. Fails with a `BoundaryError` otherwise.
     */
    fn resolve(
        &self,
        project: &Project,
        relative_path: &str,
        access: &AccessContext,
    ) -> Result<PathBuf>;
}

pub struct CorePathResolver {}

impl CorePathResolver {
    pub fn new() -> Self {
        CorePathResolver {}
    }
}

impl Default for CorePathResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl PathResolverOperations for CorePathResolver {
    fn resolve(
        &self,
        project: &Project,
        relative_path: &str,
        access: &AccessContext,
    ) -> Result<PathBuf> {
        let segments = normalize_relative_path(relative_path).map_err(|reason| {
            log::warn!(
                "PathResolver: Rejected {relative_path:?} for project '{}': {reason}",
                project.id
            );
            BoundaryError::new(relative_path, reason)
        })?;

        let Some(file_name) = segments.last() else {
            return Err(BoundaryError::new(relative_path, BoundaryReason::NotAFile));
        };
        if segments.iter().any(|s| s.starts_with('.')) {
            log::debug!("PathResolver: Hidden segment in {relative_path:?}, treating as missing.");
            return Err(BoundaryError::new(relative_path, BoundaryReason::Missing));
        }
        if !is_markdown_file_name(file_name) {
            return Err(BoundaryError::new(relative_path, BoundaryReason::NotMarkdown));
        }

        let mut failure = BoundaryReason::Missing;
        for root_name in project.permitted_roots(access) {
            let root_dir = project.root_dir(root_name);
            let candidate = segments
                .iter()
                .fold(root_dir.clone(), |path, segment| path.join(segment));

            if fs::symlink_metadata(&candidate).is_err() {
                log::trace!("PathResolver: {candidate:?} not present under root '{root_name}'.");
                continue;
            }

            // Canonical comparison catches symlinks anywhere along the path.
            let (canonical_root, canonical_candidate) =
                match (root_dir.canonicalize(), candidate.canonicalize()) {
                    (Ok(root), Ok(target)) => (root, target),
                    _ => {
                        log::debug!(
                            "PathResolver: Could not canonicalize {candidate:?}, treating as missing."
                        );
                        continue;
                    }
                };
            if !canonical_candidate.starts_with(&canonical_root) {
                log::warn!(
                    "PathResolver: {relative_path:?} in project '{}' resolves outside root '{root_name}'.",
                    project.id
                );
                return Err(BoundaryError::new(relative_path, BoundaryReason::Escapes));
            }

            if canonical_candidate.is_file() {
                log::debug!(
                    "PathResolver: Resolved {relative_path:?} to {canonical_candidate:?} (root '{root_name}')."
                );
                return Ok(canonical_candidate);
            }
            failure = BoundaryReason::NotAFile;
        }

        Err(BoundaryError::new(relative_path, failure))
    }
}
