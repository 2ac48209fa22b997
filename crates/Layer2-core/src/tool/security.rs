//! Tool Security - 보안 유틸리티
//!
//! 도구 실행 시 보안 검증을 위한 유틸리티 제공
//!
//! ## 기능
//! - 워크스페이스 경로 검증 (path traversal 방지)
//! - 심볼릭 링크 탈출 차단

use loom_foundation::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// 경로 검증 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathValidation {
    /// 경로가 유효함 (정규화된 절대 경로)
    Valid(PathBuf),

    /// 경로가 워크스페이스 밖
    OutsideWorkspace { path: PathBuf, root: PathBuf },

    /// 심볼릭 링크 탈출
    SymlinkEscape { path: PathBuf, target: PathBuf },
}

impl PathValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, PathValidation::Valid(_))
    }

    pub fn error_message(&self) -> Option<String> {
        match self {
            PathValidation::Valid(_) => None,
            PathValidation::OutsideWorkspace { path, root } => Some(format!(
                "Path '{}' escapes the workspace root '{}'",
                path.display(),
                root.display()
            )),
            PathValidation::SymlinkEscape { path, target } => Some(format!(
                "Symlink escape detected: '{}' points to '{}'",
                path.display(),
                target.display()
            )),
        }
    }

    /// Result로 변환
    pub fn into_result(self) -> Result<PathBuf> {
        match self {
            PathValidation::Valid(path) => Ok(path),
            other => Err(Error::PermissionDenied(
                other.error_message().unwrap_or_default(),
            )),
        }
    }
}

/// 워크스페이스 경로 검증기
#[derive(Debug, Clone)]
pub struct PathValidator {
    root: PathBuf,
}

impl PathValidator {
    /// 워크스페이스 루트로 검증기 생성
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let root = root
            .canonicalize()
            .unwrap_or_else(|_| normalize_path(&absolutize(root)));
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 경로 검증 (상대 경로는 루트 기준)
    pub fn validate(&self, path: &Path) -> PathValidation {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        let normalized = normalize_path(&joined);

        if !normalized.starts_with(&self.root) {
            return PathValidation::OutsideWorkspace {
                path: normalized,
                root: self.root.clone(),
            };
        }

        // 존재하는 경로는 실제 위치 확인 (심볼릭 링크)
        if let Ok(resolved) = normalized.canonicalize() {
            if !resolved.starts_with(&self.root) {
                return PathValidation::SymlinkEscape {
                    path: normalized,
                    target: resolved,
                };
            }
        }

        PathValidation::Valid(normalized)
    }

    /// 검증 후 절대 경로 반환
    pub fn resolve(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        self.validate(path.as_ref()).into_result()
    }
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

/// `.`/`..` 제거 (파일 시스템 접근 없이)
fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::ParentDir => {
                if matches!(components.last(), Some(Component::Normal(_))) {
                    components.pop();
                }
            }
            Component::CurDir => {}
            _ => components.push(component),
        }
    }

    components.iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_relative_path_inside() {
        let dir = TempDir::new().unwrap();
        let validator = PathValidator::new(dir.path());
        let resolved = validator.resolve("src/main.rs").unwrap();
        assert!(resolved.starts_with(validator.root()));
        assert!(resolved.ends_with("src/main.rs"));
    }

    #[test]
    fn test_traversal_rejected() {
        let dir = TempDir::new().unwrap();
        let validator = PathValidator::new(dir.path());
        let validation = validator.validate(Path::new("../../etc/passwd"));
        assert!(matches!(validation, PathValidation::OutsideWorkspace { .. }));
        assert!(validation.error_message().unwrap().contains("escapes"));
    }

    #[test]
    fn test_absolute_outside_rejected() {
        let dir = TempDir::new().unwrap();
        let validator = PathValidator::new(dir.path());
        assert!(validator.resolve("/etc/hosts").is_err());
    }

    #[test]
    fn test_dotdot_inside_allowed() {
        let dir = TempDir::new().unwrap();
        let validator = PathValidator::new(dir.path());
        assert!(validator.resolve("a/../b.txt").is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escape() {
        let dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();

        let validator = PathValidator::new(dir.path());
        let validation = validator.validate(Path::new("link"));
        assert!(matches!(validation, PathValidation::SymlinkEscape { .. }));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(
            normalize_path(Path::new("/a/./b/../c")),
            PathBuf::from("/a/c")
        );
    }
}
