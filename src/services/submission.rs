//! 提交服务 - 业务能力层
//!
//! 每道整题或每个小题是一个提交单元，逐个串行提交。
//! 遇到第一个失败就停止；之前已提交的单元不会撤回，重试会把所有单元重新发送一遍。

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::clients::{QuestionBankApi, StatusUpdate, UnitPayload};
use crate::models::{QuestionBody, QuestionPaperDraft, RawImage};
use crate::services::attachment_codec::{self, AttachmentError};
use crate::utils::logging;
use crate::workflow::UnitCtx;

/// 一个待提交的单元
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionUnit {
    /// "1"、"1a"、"Q3"、"Q3b"
    pub number: String,
    pub text: String,
    pub co: String,
    pub level: String,
    pub marks: u32,
    pub image: Option<RawImage>,
}

/// 提交中断的原因
#[derive(Debug, Error)]
pub enum SubmissionFailure {
    #[error("试卷中没有可提交的题目")]
    NothingToSubmit,
    #[error("附件处理失败: {0}")]
    Attachment(#[from] AttachmentError),
    #[error("题目 {unit} 提交失败（此前已提交 {submitted} 个）: {message}")]
    UnitFailed {
        unit: String,
        submitted: usize,
        message: String,
    },
}

/// 按试卷顺序展开所有提交单元，跳过没有题干的单元
///
/// 小题没有自己的 CO/层级，沿用所属大题的设置；未填分值按 0 分提交。
pub fn plan_units(draft: &QuestionPaperDraft) -> Result<Vec<SubmissionUnit>, AttachmentError> {
    let mut units = Vec::new();

    for question in draft.questions() {
        let number = draft.display_label(question);
        let image = question.image.as_ref().map(attachment_codec::to_raw).transpose()?;

        match &question.body {
            QuestionBody::Simple { text, marks } => {
                if text.trim().is_empty() {
                    continue;
                }
                units.push(SubmissionUnit {
                    number,
                    text: text.clone(),
                    co: question.co.clone(),
                    level: question.level.clone(),
                    marks: *marks,
                    image,
                });
            }
            QuestionBody::Split { sub_questions } => {
                for sub in sub_questions {
                    if sub.text.trim().is_empty() {
                        continue;
                    }
                    units.push(SubmissionUnit {
                        number: format!("{}{}", number, sub.label),
                        text: sub.text.clone(),
                        co: question.co.clone(),
                        level: question.level.clone(),
                        marks: sub.marks.unwrap_or(0),
                        image: sub.image.as_ref().map(attachment_codec::to_raw).transpose()?,
                    });
                }
            }
        }
    }
    Ok(units)
}

/// 提交服务
pub struct SubmissionService {
    api: Arc<dyn QuestionBankApi>,
}

impl SubmissionService {
    pub fn new(api: Arc<dyn QuestionBankApi>) -> Self {
        Self { api }
    }

    /// 串行提交所有单元，返回成功提交的数量
    pub async fn submit(
        &self,
        draft: &QuestionPaperDraft,
        faculty_email: &str,
    ) -> Result<usize, SubmissionFailure> {
        let units = plan_units(draft)?;
        if units.is_empty() {
            return Err(SubmissionFailure::NothingToSubmit);
        }

        let subject = &draft.subject;
        logging::log_submission_start(&subject.code, units.len());

        let total = units.len();
        for (index, unit) in units.into_iter().enumerate() {
            let ctx = UnitCtx::new(&subject.code, &unit.number, index + 1, total);
            info!(
                "{} 📤 正在提交: {}",
                ctx,
                logging::truncate_text(&unit.text, 40)
            );

            let payload = UnitPayload {
                subject_code: subject.code.clone(),
                subject_name: subject.name.clone(),
                semester: subject.semester.unwrap_or_default(),
                question_number: unit.number.clone(),
                question_text: unit.text,
                co: unit.co,
                level: unit.level,
                marks: unit.marks,
                faculty_email: faculty_email.to_string(),
                exam_type: draft.exam_type.as_str().to_string(),
                image: unit.image,
            };

            if let Err(e) = self.api.submit_unit(&payload).await {
                error!("{} ❌ 提交失败: {}", ctx, e);
                if index > 0 {
                    warn!("{} ⚠️ 前 {} 个单元已提交，不会撤回", ctx, index);
                }
                return Err(SubmissionFailure::UnitFailed {
                    unit: unit.number,
                    submitted: index,
                    message: e.to_string(),
                });
            }
            info!("{} ✓ 提交成功", ctx);
        }

        logging::log_submission_complete(&subject.code, total);
        Ok(total)
    }

    /// 通知后端出题任务已完成；失败只记录，不影响提交结果
    pub async fn notify_submitted(
        &self,
        draft: &QuestionPaperDraft,
        faculty_email: &str,
    ) -> Option<String> {
        let update = StatusUpdate {
            faculty_email: faculty_email.to_string(),
            subject_code: draft.subject.code.clone(),
            status: "Submitted".to_string(),
        };
        match self.api.update_assignment_status(&update).await {
            Ok(()) => {
                info!("✓ 出题任务状态已更新: {}", update.subject_code);
                None
            }
            Err(e) => {
                warn!("⚠️ 出题任务状态更新失败（不影响提交）: {}", e);
                Some(e.to_string())
            }
        }
    }
}
