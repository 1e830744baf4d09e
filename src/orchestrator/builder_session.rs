//! 出题会话 - 编排层
//!
//! 对应出题页面的一次挂载：加载草稿、转发编辑、保存/清空、提交，
//! 以及在会话期间运行计时器。页面卸载时调用 `unmount`（或直接 drop）。

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::{error, info, warn};

use crate::clients::QuestionBankApi;
use crate::config::Config;
use crate::error::{AppError, AppResult, ConfigError, StorageError};
use crate::infrastructure::DurableStore;
use crate::models::{AssignedSubject, ExamType, QuestionPaperDraft, SubjectInfo, Violation};
use crate::orchestrator::session_guard::{SessionGuard, SessionHooks, SessionTimings};
use crate::services::{
    paper_preview, validation, DraftRepository, SubmissionFailure, SubmissionService,
};
use crate::workflow::{DraftStore, PaperState, Rejection};

/// 会话操作失败的原因
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Rejected(#[from] Rejection),
    #[error(transparent)]
    Invalid(#[from] Violation),
    #[error(transparent)]
    Submission(#[from] SubmissionFailure),
    #[error(transparent)]
    App(#[from] AppError),
}

/// 提交结果
///
/// 后两项是提交成功之后的附带动作，失败不影响提交本身
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReport {
    pub submitted: usize,
    pub draft_cleanup_error: Option<String>,
    pub status_update_error: Option<String>,
}

/// 计时器回调：保存草稿、超时登出
struct DraftAutosave {
    faculty_email: String,
    store: Arc<Mutex<DraftStore>>,
    repository: Arc<DraftRepository>,
    logout: watch::Sender<bool>,
}

impl DraftAutosave {
    async fn save_best_effort(&self, reason: &str) {
        // 保存期间持有锁，保证提交完成后不会再写回旧草稿
        let store = self.store.lock().await;
        if store.is_submitted() {
            return;
        }
        match self.repository.save(&self.faculty_email, store.draft()).await {
            Ok(_) => info!("💾 {}完成", reason),
            Err(e) => warn!("⚠️ {}失败: {}", reason, e),
        }
    }
}

#[async_trait]
impl SessionHooks for DraftAutosave {
    async fn autosave(&self) {
        self.save_best_effort("自动保存").await;
    }

    async fn expire(&self) {
        self.save_best_effort("登出前保存").await;
        let _ = self.logout.send(true);
    }
}

/// 出题会话
pub struct BuilderSession {
    faculty_email: String,
    store: Arc<Mutex<DraftStore>>,
    repository: Arc<DraftRepository>,
    api: Arc<dyn QuestionBankApi>,
    submitter: SubmissionService,
    state: PaperState,
    guard: Option<SessionGuard>,
    logged_out: watch::Receiver<bool>,
    subjects: Vec<AssignedSubject>,
}

impl BuilderSession {
    /// 挂载会话：读取该教师的草稿（没有则新建），启动计时器
    ///
    /// 已保存的草稿类型与本次不同时不会加载，新草稿保存后会覆盖它。
    pub async fn mount(
        config: &Config,
        exam_type: ExamType,
        durable: Arc<dyn DurableStore>,
        api: Arc<dyn QuestionBankApi>,
    ) -> AppResult<Self> {
        let faculty_email = config.faculty_email.trim().to_string();
        if faculty_email.is_empty() {
            return Err(AppError::Config(ConfigError::MissingValue {
                name: "faculty_email".to_string(),
            }));
        }

        let repository = Arc::new(DraftRepository::new(durable));
        let stored = match repository.load(&faculty_email).await {
            Ok(stored) => stored,
            Err(e @ AppError::Storage(StorageError::CorruptRecord { .. })) => {
                warn!("⚠️ 已保存的草稿无法使用，使用新草稿（保存后覆盖）: {}", e);
                None
            }
            Err(e) => return Err(e),
        };
        let draft = match stored {
            Some(draft) if draft.exam_type == exam_type => draft,
            Some(draft) => {
                warn!(
                    "⚠️ 已保存的草稿类型为 {}，本次为 {}，使用新草稿",
                    draft.exam_type, exam_type
                );
                QuestionPaperDraft::new(exam_type)
            }
            None => QuestionPaperDraft::new(exam_type),
        };

        let state = if draft.is_submitted {
            PaperState::Submitted
        } else if draft.is_blank() {
            PaperState::Empty
        } else {
            PaperState::Editing
        };

        let store = Arc::new(Mutex::new(DraftStore::from_draft(draft)));
        let (logout_tx, logout_rx) = watch::channel(false);

        let guard = (state != PaperState::Submitted).then(|| {
            let hooks = Arc::new(DraftAutosave {
                faculty_email: faculty_email.clone(),
                store: store.clone(),
                repository: repository.clone(),
                logout: logout_tx,
            });
            SessionGuard::start(hooks, SessionTimings::from(config))
        });

        info!("📝 出题会话已挂载: {} ({}, 状态 {})", faculty_email, exam_type, state);

        Ok(Self {
            faculty_email,
            store,
            repository,
            submitter: SubmissionService::new(api.clone()),
            api,
            state,
            guard,
            logged_out: logout_rx,
            subjects: Vec::new(),
        })
    }

    pub fn faculty_email(&self) -> &str {
        &self.faculty_email
    }

    pub fn state(&self) -> PaperState {
        self.state
    }

    /// 当前草稿快照
    pub async fn draft(&self) -> QuestionPaperDraft {
        self.store.lock().await.draft().clone()
    }

    pub async fn preview(&self) -> String {
        paper_preview::render_preview(self.store.lock().await.draft())
    }

    /// 页面提示面板用：列出所有未通过校验的地方
    pub async fn violations(&self) -> Vec<Violation> {
        validation::collect_violations(self.store.lock().await.draft())
    }

    /// 把页面上的编辑转发给草稿
    ///
    /// 被拒绝时草稿不变，返回的 [`Rejection`] 用于提示用户；
    /// 登出之后的编辑不会再被保存，因此一律拒绝
    pub async fn edit<T, F>(&mut self, f: F) -> Result<T, Rejection>
    where
        F: FnOnce(&mut DraftStore) -> Result<T, Rejection>,
    {
        let result = match self.ensure_active() {
            Ok(()) => {
                self.record_activity();
                let mut store = self.store.lock().await;
                f(&mut store)
            }
            Err(rejection) => Err(rejection),
        };
        match &result {
            Ok(_) => self.state = self.state.on_edit(),
            Err(rejection) => warn!("⚠️ {}", rejection),
        }
        result
    }

    /// 用户有操作，重置无操作计时
    pub fn record_activity(&self) {
        if let Some(guard) = &self.guard {
            guard.record_activity();
        }
    }

    /// 是否已因长时间无操作被登出
    pub fn is_logged_out(&self) -> bool {
        *self.logged_out.borrow()
    }

    /// 订阅登出信号，页面据此跳转到登录页
    pub fn logout_signal(&self) -> watch::Receiver<bool> {
        self.logged_out.clone()
    }

    /// 手动保存草稿；已提交时什么都不做
    pub async fn save_draft(&self) -> AppResult<()> {
        let store = self.store.lock().await;
        if store.is_submitted() {
            return Ok(());
        }
        self.repository.save(&self.faculty_email, store.draft()).await?;
        info!("💾 草稿已保存");
        Ok(())
    }

    /// 清空草稿并删除已保存的记录
    pub async fn clear_draft(&mut self) -> Result<(), SessionError> {
        self.ensure_active()?;
        self.store.lock().await.clear()?;
        self.repository.clear(&self.faculty_email).await?;
        self.state = self.state.on_clear();
        Ok(())
    }

    /// 查询分配给该教师的科目
    pub async fn load_subjects(&mut self) -> AppResult<&[AssignedSubject]> {
        self.subjects = self.api.fetch_subject_codes(&self.faculty_email).await?;
        info!("📚 分配科目 {} 个", self.subjects.len());
        Ok(&self.subjects)
    }

    /// 从已查询到的科目中选择一个，写入草稿
    pub async fn select_subject(&mut self, subject_code: &str) -> Result<(), Rejection> {
        let subject = self
            .subjects
            .iter()
            .find(|s| s.subject_code == subject_code)
            .ok_or_else(|| Rejection::UnknownSubject(subject_code.to_string()))?;
        if subject.is_submitted() {
            warn!("⚠️ 科目 {} 已交卷", subject_code);
            return Err(Rejection::SubjectAlreadySubmitted(subject_code.to_string()));
        }
        let info = SubjectInfo::from(subject);
        self.edit(|store| store.set_subject(info)).await
    }

    /// 校验并提交整份试卷
    ///
    /// 中途失败时已提交的单元不会撤回，草稿保持可编辑；
    /// 再次提交会重新发送全部单元。
    pub async fn submit(&mut self) -> Result<SubmissionReport, SessionError> {
        if self.is_logged_out() {
            return Err(Rejection::LoggedOut.into());
        }
        let draft = {
            let store = self.store.lock().await;
            if store.is_submitted() {
                return Err(Rejection::Submitted.into());
            }
            store.draft().clone()
        };

        if let Err(violation) = validation::validate(&draft) {
            warn!("⚠️ 校验未通过: {}", violation);
            return Err(violation.into());
        }

        self.state = self.state.on_submit_start();
        let submitted = match self.submitter.submit(&draft, &self.faculty_email).await {
            Ok(count) => count,
            Err(failure) => {
                self.state = self.state.on_submit_finished(false);
                error!("❌ 试卷提交中断: {}", failure);
                return Err(failure.into());
            }
        };

        self.store.lock().await.mark_submitted();
        self.state = self.state.on_submit_finished(true);
        self.stop_timers();

        let draft_cleanup_error = match self.repository.clear(&self.faculty_email).await {
            Ok(()) => None,
            Err(e) => {
                warn!("⚠️ 删除已提交的草稿失败: {}", e);
                Some(e.to_string())
            }
        };
        let status_update_error = self
            .submitter
            .notify_submitted(&draft, &self.faculty_email)
            .await;

        info!("✅ 试卷提交完成，共 {} 个单元", submitted);
        Ok(SubmissionReport {
            submitted,
            draft_cleanup_error,
            status_update_error,
        })
    }

    /// 页面卸载
    pub async fn unmount(mut self) {
        if let Some(guard) = self.guard.take() {
            guard.shutdown().await;
        }
        info!("出题会话已卸载: {}", self.faculty_email);
    }

    fn ensure_active(&self) -> Result<(), Rejection> {
        if self.is_logged_out() {
            return Err(Rejection::LoggedOut);
        }
        match self.state {
            state if state.can_edit() => Ok(()),
            PaperState::Submitting => Err(Rejection::SubmissionInProgress),
            _ => Err(Rejection::Submitted),
        }
    }

    fn stop_timers(&mut self) {
        if let Some(guard) = self.guard.take() {
            guard.stop();
        }
    }
}
