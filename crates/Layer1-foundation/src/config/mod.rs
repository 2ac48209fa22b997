//! Config - 통합 설정 관리
//!
//! - `agent.rs` - 에이전트 루프/컨텍스트/루프 감지 설정 (AgentConfig)
//! - `provider.rs` - 모델 백엔드 연결 설정 (ProviderSettings)
//!
//! 로드 순서: 기본값 → `~/.loom/config.json` → `.loom/config.json` → `LOOM_*` 환경 변수

mod agent;
mod provider;

pub use agent::{AgentConfig, CONFIG_FILE, DOMAINS_DIR};
pub use provider::ProviderSettings;
