//! Extension Discovery - 확장 발견 및 로드
//!
//! 검색 경로 (등록 순서):
//! 1. `<workspace>/.loom/extensions/*`
//! 2. `~/.loom/extensions/*`
//! 3. 설정의 `extension_dirs`
//!
//! 각 하위 디렉토리의 `manifest.json`을 읽어 `DirectoryExtension`을 만듭니다.

use super::command_tool::CommandTool;
use super::manifest::{ExtensionManifest, ToolDescriptor, MANIFEST_FILE};
use crate::tool::registry::{ExtensionReport, ToolRegistry};
use loom_foundation::{AgentConfig, Error, Result, Tool, ToolExtension, STATE_DIR};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 확장 디렉토리 이름
pub const EXTENSIONS_DIR: &str = "extensions";

// ============================================================================
// DirectoryExtension - manifest 기반 확장
// ============================================================================

/// 디렉토리에서 로드한 확장
pub struct DirectoryExtension {
    namespace: String,
    description: String,
    path: PathBuf,
    tools: Vec<Arc<dyn Tool>>,
}

impl DirectoryExtension {
    /// 확장 디렉토리 로드
    ///
    /// 매니페스트 오류는 에러, 개별 도구 기술 파일 오류는 로그 후 건너뜀
    pub async fn load(dir: &Path) -> Result<Self> {
        let manifest_path = dir.join(MANIFEST_FILE);
        let content = tokio::fs::read_to_string(&manifest_path).await?;
        let manifest = ExtensionManifest::parse(&content)?;

        let mut tools: Vec<Arc<dyn Tool>> = Vec::new();
        for file in &manifest.tools {
            match load_descriptor(dir, file).await {
                Ok(tool) => tools.push(Arc::new(tool)),
                Err(e) => warn!(
                    "Skipping tool '{}' in extension '{}': {}",
                    file, manifest.metadata.tag, e
                ),
            }
        }

        debug!(
            "Loaded extension '{}' with {} tools from {:?}",
            manifest.metadata.tag,
            tools.len(),
            dir
        );

        Ok(Self {
            namespace: manifest.metadata.tag,
            description: manifest.metadata.description,
            path: dir.to_path_buf(),
            tools,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

async fn load_descriptor(dir: &Path, file: &str) -> Result<CommandTool> {
    let path = dir.join(file);
    if !path.starts_with(dir) || file.contains("..") {
        return Err(Error::Extension(format!(
            "tool descriptor '{}' is outside the extension directory",
            file
        )));
    }
    let content = tokio::fs::read_to_string(&path).await?;
    let descriptor = ToolDescriptor::parse(&content)?;
    CommandTool::new(descriptor, dir)
}

impl ToolExtension for DirectoryExtension {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn register(&self) -> Result<Vec<Arc<dyn Tool>>> {
        Ok(self.tools.clone())
    }
}

// ============================================================================
// ExtensionDiscovery - 확장 발견 시스템
// ============================================================================

/// 확장 발견 시스템
pub struct ExtensionDiscovery {
    search_paths: Vec<PathBuf>,
}

impl ExtensionDiscovery {
    /// 워크스페이스와 사용자 홈 기준 기본 경로
    pub fn new(workspace_root: &Path) -> Self {
        let mut search_paths = vec![workspace_root.join(STATE_DIR).join(EXTENSIONS_DIR)];
        if let Some(home) = dirs::home_dir() {
            search_paths.push(home.join(STATE_DIR).join(EXTENSIONS_DIR));
        }
        Self { search_paths }
    }

    /// 설정 기반 (extension_dirs 포함)
    pub fn from_config(config: &AgentConfig) -> Self {
        let mut discovery = Self::new(&config.workspace_root);
        for dir in &config.extension_dirs {
            discovery.add_search_path(dir);
        }
        discovery
    }

    /// 홈 디렉토리를 제외한 명시적 경로만 사용
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            search_paths: paths,
        }
    }

    pub fn add_search_path(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.search_paths.contains(&path) {
            self.search_paths.push(path);
        }
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// `<path>/*/manifest.json` 목록 (경로별 정렬)
    fn manifest_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        for base in &self.search_paths {
            if !base.is_dir() {
                continue;
            }
            let pattern = base.join("*").join(MANIFEST_FILE);
            let pattern = pattern.to_string_lossy();
            let entries = match glob::glob(&pattern) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Invalid extension search path {:?}: {}", base, e);
                    continue;
                }
            };
            let mut found: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok())
                .filter_map(|manifest| manifest.parent().map(Path::to_path_buf))
                .collect();
            found.sort();
            dirs.extend(found);
        }
        dirs
    }

    /// 모든 확장 발견 (실패한 확장은 로그 후 건너뜀)
    pub async fn discover(&self) -> Vec<DirectoryExtension> {
        let mut extensions = Vec::new();
        for dir in self.manifest_dirs() {
            match DirectoryExtension::load(&dir).await {
                Ok(ext) => extensions.push(ext),
                Err(e) => warn!("Failed to load extension {:?}: {}", dir, e),
            }
        }
        info!("Discovered {} extensions", extensions.len());
        extensions
    }

    /// 발견 후 레지스트리에 등록
    pub async fn load_into(
        &self,
        registry: &mut ToolRegistry,
        unsafe_mode: bool,
    ) -> Vec<ExtensionReport> {
        let mut reports = Vec::new();
        for ext in self.discover().await {
            let report = registry.load_extension(&ext, unsafe_mode);
            info!(
                "Extension '{}': {} registered, {} skipped (unsafe), {} failed",
                report.namespace,
                report.registered.len(),
                report.skipped_unsafe.len(),
                report.failed.len()
            );
            reports.push(report);
        }
        reports
    }
}
