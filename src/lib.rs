//! # Question Paper Builder
//!
//! 试卷草稿编辑与提交
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Infrastructure / Clients）
//! - `infrastructure/` - 草稿的持久化存储（`DurableStore`）
//! - `clients/` - 题库后端 HTTP 接口（`QuestionBankApi`）
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 单一能力，不持有会话状态
//! - `validation` - 提交前校验
//! - `attachment_codec` - 图片附件与可序列化格式互转
//! - `draft_repository` - 按教师保存 / 读取 / 删除草稿
//! - `submission` - 拆分提交单元并串行提交
//! - `paper_preview` - 生成试卷预览
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 草稿编辑规则与页面状态
//! - `DraftStore` - 所有编辑操作的唯一入口
//! - `PaperState` - Empty → Editing → Submitting → Submitted
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/builder_session` - 一次出题会话
//! - `orchestrator/session_guard` - 自动保存与无操作登出
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{QuestionBankApi, QuestionBankClient};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{DurableStore, FileStore, MemoryStore};
pub use models::{ExamType, Question, QuestionPaperDraft};
pub use orchestrator::{BuilderSession, SessionError, SubmissionReport};
pub use workflow::{DraftStore, FieldUpdate, PaperState, QuestionAddr, Rejection};
