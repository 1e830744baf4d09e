//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 把一次出题页面的生命周期串起来：挂载、编辑、计时、提交、卸载。
//!
//! ## 模块划分
//!
//! ### `builder_session` - 出题会话
//! - 挂载时按教师邮箱加载草稿
//! - 转发编辑操作，维护页面状态（PaperState）
//! - 手动保存 / 清空草稿
//! - 校验后串行提交，提交成功后删除草稿并更新分配状态
//!
//! ### `session_guard` - 会话计时器
//! - 无操作超时：保存草稿后登出
//! - 定时自动保存
//! - 会话结束（unmount / drop）时取消所有计时
//!
//! ## 层次关系
//!
//! ```text
//! builder_session (一份试卷)
//!     ↓                ↘
//! workflow::DraftStore   session_guard
//!     ↓
//! services (validation / submission / draft_repository)
//!     ↓
//! clients + infrastructure (QuestionBankApi / DurableStore)
//! ```

pub mod builder_session;
pub mod session_guard;

// 重新导出主要类型
pub use builder_session::{BuilderSession, SessionError, SubmissionReport};
pub use session_guard::{SessionGuard, SessionHooks, SessionTimings};
