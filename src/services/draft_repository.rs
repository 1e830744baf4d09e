//! 草稿持久化服务 - 业务能力层
//!
//! 一个教师一条记录：`questionPaper_draft_<email>`，内容是整份草稿的 JSON，
//! 图片以 data URL 形式内嵌。

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::infrastructure::DurableStore;
use crate::models::QuestionPaperDraft;
use crate::services::attachment_codec;

const KEY_PREFIX: &str = "questionPaper_draft_";

/// 草稿仓库
pub struct DraftRepository {
    store: Arc<dyn DurableStore>,
}

impl DraftRepository {
    pub fn new(store: Arc<dyn DurableStore>) -> Self {
        Self { store }
    }

    pub fn key_for(faculty_email: &str) -> String {
        format!("{}{}", KEY_PREFIX, faculty_email)
    }

    /// 保存草稿，返回写入的记录（附件已编码、带保存时间）
    ///
    /// 传入的草稿本身不变，内存里的附件仍保持原始二进制形式。
    pub async fn save(
        &self,
        faculty_email: &str,
        draft: &QuestionPaperDraft,
    ) -> AppResult<QuestionPaperDraft> {
        let key = Self::key_for(faculty_email);

        let mut record = draft.clone();
        let encoded = attachment_codec::encode_draft(&mut record)?;
        record.last_saved_at = Some(Utc::now());

        let json = serde_json::to_string(&record)?;
        self.store.set(&key, &json).await?;

        debug!("草稿已保存: {} (新编码附件 {} 个, {} 字节)", key, encoded, json.len());
        Ok(record)
    }

    /// 读取草稿并把附件解码回二进制；没有记录时返回 None
    ///
    /// 结构不合法或附件无法解码的记录一律视为损坏。
    pub async fn load(&self, faculty_email: &str) -> AppResult<Option<QuestionPaperDraft>> {
        let key = Self::key_for(faculty_email);
        let Some(json) = self.store.get(&key).await? else {
            return Ok(None);
        };

        let mut draft: QuestionPaperDraft =
            serde_json::from_str(&json).map_err(|e| AppError::corrupt_record(&key, e))?;
        draft
            .check_shape()
            .map_err(|e| AppError::corrupt_record(&key, e))?;
        let decoded = attachment_codec::decode_draft(&mut draft)
            .map_err(|e| AppError::corrupt_record(&key, e))?;

        info!("📂 已加载草稿 {} (附件 {} 个)", key, decoded);
        Ok(Some(draft))
    }

    pub async fn clear(&self, faculty_email: &str) -> AppResult<()> {
        let key = Self::key_for(faculty_email);
        self.store.remove(&key).await?;
        info!("🗑️ 已删除草稿 {}", key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::MemoryStore;
    use crate::models::{Attachment, ExamType, QuestionBody, QuestionMode, RawImage};

    const EMAIL: &str = "prof@example.edu";

    fn repo() -> (Arc<MemoryStore>, DraftRepository) {
        let store = Arc::new(MemoryStore::new());
        let repo = DraftRepository::new(store.clone());
        (store, repo)
    }

    #[tokio::test]
    async fn test_save_and_load_preserves_images() {
        let (store, repo) = repo();
        let image = RawImage::new(vec![7, 7, 7, 0, 1], "fig1.png", "image/png");

        let mut draft = QuestionPaperDraft::new(ExamType::Mba);
        draft.instructions = "Answer any five".into();
        draft.mba_questions[1].image = Some(image.clone().into());
        draft.mba_questions[2].body.switch_mode(QuestionMode::Split);
        if let QuestionBody::Split { sub_questions } = &mut draft.mba_questions[2].body {
            sub_questions[0].image = Some(image.clone().into());
        }

        let saved = repo.save(EMAIL, &draft).await.unwrap();
        assert!(saved.last_saved_at.is_some());
        assert!(saved.mba_questions[1].image.as_ref().unwrap().is_encoded());
        // 内存中的草稿不受影响
        assert_eq!(draft.mba_questions[1].image, Some(Attachment::Raw(image.clone())));
        assert!(store.contains("questionPaper_draft_prof@example.edu"));

        let loaded = repo.load(EMAIL).await.unwrap().unwrap();
        assert_eq!(loaded.instructions, "Answer any five");
        assert_eq!(loaded.mba_questions[1].image, Some(Attachment::Raw(image.clone())));
        assert_eq!(
            loaded.mba_questions[2].body.sub_questions()[0].image,
            Some(Attachment::Raw(image))
        );
        assert_eq!(loaded.last_saved_at, saved.last_saved_at);
    }

    #[tokio::test]
    async fn test_missing_and_cleared_drafts() {
        let (_, repo) = repo();
        assert!(repo.load(EMAIL).await.unwrap().is_none());

        repo.save(EMAIL, &QuestionPaperDraft::new(ExamType::BeMtech))
            .await
            .unwrap();
        repo.clear(EMAIL).await.unwrap();
        assert!(repo.load(EMAIL).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_record_is_reported() {
        let (store, repo) = repo();
        store
            .set(&DraftRepository::key_for(EMAIL), "{not json")
            .await
            .unwrap();
        let err = repo.load(EMAIL).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Storage(crate::error::StorageError::CorruptRecord { .. })
        ));
    }

    async fn load_raw(json: &str) -> AppResult<Option<QuestionPaperDraft>> {
        let (store, repo) = repo();
        store.set(&DraftRepository::key_for(EMAIL), json).await.unwrap();
        repo.load(EMAIL).await
    }

    #[tokio::test]
    async fn test_out_of_shape_records_are_corrupt() {
        let mut draft = QuestionPaperDraft::new(ExamType::BeMtech);
        draft.modules = (0..7).map(crate::models::Module::numbered).collect();
        let seven_modules = serde_json::to_string(&draft).unwrap();
        assert!(matches!(
            load_raw(&seven_modules).await,
            Err(AppError::Storage(crate::error::StorageError::CorruptRecord { .. }))
        ));

        let no_mba_questions = r#"{"courseOutcomes":["CO1"],"examType":"MBA"}"#;
        assert!(matches!(
            load_raw(no_mba_questions).await,
            Err(AppError::Storage(crate::error::StorageError::CorruptRecord { .. }))
        ));

        let many_subs: Vec<String> = (0..200)
            .map(|i| format!(r#"{{"label":"{}","text":"t","marks":0}}"#, i))
            .collect();
        let mut question = serde_json::json!({"label": "1", "co": "CO1", "level": "L1"});
        question["subQuestions"] =
            serde_json::from_str(&format!("[{}]", many_subs.join(","))).unwrap();
        let record = serde_json::json!({
            "courseOutcomes": ["CO1"],
            "examType": "BE_MTECH",
            "modules": [{"title": "", "questions": [question, {"label": "2"}]}]
        });
        assert!(matches!(
            load_raw(&record.to_string()).await,
            Err(AppError::Storage(crate::error::StorageError::CorruptRecord { .. }))
        ));
    }

    #[tokio::test]
    async fn test_undecodable_attachment_is_corrupt() {
        let record = serde_json::json!({
            "courseOutcomes": ["CO1"],
            "examType": "BE_MTECH",
            "modules": [{"title": "", "questions": [
                {"label": "1", "image": {"data": "not-a-data-url", "name": "a.png", "type": "image/png", "size": 3}},
                {"label": "2"}
            ]}]
        });
        assert!(matches!(
            load_raw(&record.to_string()).await,
            Err(AppError::Storage(crate::error::StorageError::CorruptRecord { .. }))
        ));
    }
}
