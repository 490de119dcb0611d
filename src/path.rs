//! Path manipulation utilities for deploy-replicator
//!
//! All paths handled by the pipeline are relative to some root (the scanned
//! repository, the target repository or a template directory). The helpers
//! here normalize them lexically, without touching the filesystem, so a path
//! that would climb out of its root is rejected before any I/O happens.

use std::path::{Component, Path, PathBuf};

use glob::{MatchOptions, Pattern};

use crate::error::{Error, Result};

const KEY_MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Match a slash-separated path against a glob pattern
///
/// `*` never crosses a `/`, while `**` matches any number of segments.
pub fn glob_match(pattern: &str, path: &str) -> Result<bool> {
    let pattern = Pattern::new(pattern).map_err(Error::Glob)?;
    Ok(pattern.matches_with(path, KEY_MATCH_OPTIONS))
}

/// Lexically normalize a relative path.
///
/// Removes `.` segments and folds `..` into its parent. Returns `None` when
/// the path is absolute or when a `..` would step above the starting point.
pub fn normalize_relative(path: &Path) -> Option<PathBuf> {
    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::Normal(part) => parts.push(part),
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(parts.iter().collect())
}

/// Whether `path` is relative and stays inside whatever root it is joined to.
pub fn is_contained_relative(path: &Path) -> bool {
    normalize_relative(path).is_some()
}

/// Join `relative` onto `root`, failing if the result would leave `root`.
pub fn resolve_within(root: &Path, relative: &Path) -> Result<PathBuf> {
    match normalize_relative(relative) {
        Some(normalized) => Ok(root.join(normalized)),
        None => Err(Error::Path {
            message: format!(
                "'{}' resolves outside of '{}'",
                relative.display(),
                root.display()
            ),
        }),
    }
}

/// Render a relative path with `/` separators regardless of platform.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Display form of a relative path, using `.` for the root itself.
pub fn display_relative(path: &Path) -> String {
    let slash = to_slash(path);
    if slash.is_empty() {
        ".".to_string()
    } else {
        slash
    }
}

/// Deepest directory that contains every path in `paths`.
pub fn common_ancestor<'a, I>(paths: I) -> PathBuf
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut ancestor: Option<Vec<Component<'a>>> = None;
    for path in paths {
        let dir: Vec<Component<'a>> = path.parent().map(|p| p.components().collect()).unwrap_or_default();
        ancestor = Some(match ancestor {
            None => dir,
            Some(current) => current
                .into_iter()
                .zip(dir)
                .take_while(|(a, b)| a == b)
                .map(|(a, _)| a)
                .collect(),
        });
    }
    ancestor
        .map(|components| components.iter().collect())
        .unwrap_or_default()
}

/// Encode a name so it can be used as a single directory name
///
/// Characters that are problematic for filesystems are replaced one to one,
/// and the reserved names `.` and `..` are rewritten.
pub fn encode_path_segment(name: &str) -> String {
    let encoded: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' => '-',
            ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' => c,
            _ => '_',
        })
        .collect();

    match encoded.as_str() {
        "" => "_".to_string(),
        "." => "_".to_string(),
        ".." => "__".to_string(),
        _ => encoded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match_key_paths() {
        assert!(glob_match("metadata/name", "metadata/name").unwrap());
        assert!(!glob_match("*/name", "spec/template/name").unwrap());
        assert!(glob_match("**/namespace", "spec/destination/namespace").unwrap());
        assert!(!glob_match("name", "metadata/name").unwrap());
    }

    #[test]
    fn test_glob_match_file_paths() {
        assert!(glob_match("templates/**", "templates/deployment.yaml").unwrap());
        assert!(glob_match("templates/**", "templates/tests/test-connection.yaml").unwrap());
        assert!(!glob_match("Chart.yaml", "values.yaml").unwrap());
    }

    #[test]
    fn test_normalize_relative() {
        assert_eq!(
            normalize_relative(Path::new("a/./b/../c")),
            Some(PathBuf::from("a/c"))
        );
        assert_eq!(normalize_relative(Path::new("a/..")), Some(PathBuf::new()));
        assert_eq!(normalize_relative(Path::new("../x")), None);
        assert_eq!(normalize_relative(Path::new("a/../../x")), None);
        assert_eq!(normalize_relative(Path::new("/etc/passwd")), None);
    }

    #[test]
    fn test_resolve_within_rejects_escape() {
        let root = Path::new("/tmp/target");
        assert_eq!(
            resolve_within(root, Path::new("deploy/app.yaml")).unwrap(),
            PathBuf::from("/tmp/target/deploy/app.yaml")
        );
        let err = resolve_within(root, Path::new("deploy/../../evil.yaml")).unwrap_err();
        assert!(err.to_string().contains("resolves outside"));
    }

    #[test]
    fn test_to_slash_and_display() {
        assert_eq!(to_slash(Path::new("charts/demo/Chart.yaml")), "charts/demo/Chart.yaml");
        assert_eq!(display_relative(Path::new("")), ".");
        assert_eq!(display_relative(Path::new("argocd")), "argocd");
    }

    #[test]
    fn test_common_ancestor() {
        let paths = [
            PathBuf::from("apps/web/overlays/prod/kustomization.yaml"),
            PathBuf::from("apps/web/base/deployment.yaml"),
        ];
        assert_eq!(
            common_ancestor(paths.iter().map(|p| p.as_path())),
            PathBuf::from("apps/web")
        );

        let single = [PathBuf::from("argocd/app.yaml")];
        assert_eq!(
            common_ancestor(single.iter().map(|p| p.as_path())),
            PathBuf::from("argocd")
        );

        let top = [PathBuf::from("kustomization.yaml")];
        assert_eq!(common_ancestor(top.iter().map(|p| p.as_path())), PathBuf::new());
    }

    #[test]
    fn test_encode_path_segment() {
        assert_eq!(encode_path_segment("demo"), "demo");
        assert_eq!(encode_path_segment("team/payments"), "team-payments");
        assert_eq!(encode_path_segment(".."), "__");
        assert_eq!(encode_path_segment(""), "_");
        assert_eq!(encode_path_segment("a:b"), "a_b");
    }
}
