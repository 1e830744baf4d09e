/// 题库 API 客户端
///
/// 封装所有与出题系统后端相关的调用逻辑
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Serialize;
use tracing::debug;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{AssignedSubject, RawImage};

/// 单个提交单元的表单内容（一道整题或一个小题）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitPayload {
    pub subject_code: String,
    pub subject_name: String,
    pub semester: u8,
    /// "1a"、"Q3b" 这样的合成题号
    pub question_number: String,
    pub question_text: String,
    pub co: String,
    pub level: String,
    pub marks: u32,
    pub faculty_email: String,
    pub exam_type: String,
    pub image: Option<RawImage>,
}

/// 出题任务状态更新
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusUpdate {
    pub faculty_email: String,
    pub subject_code: String,
    pub status: String,
}

/// 后端接口
///
/// 提交流程只依赖这个 trait，测试时可以换成假实现
#[async_trait]
pub trait QuestionBankApi: Send + Sync {
    /// 查询教师被分配的科目
    async fn fetch_subject_codes(&self, faculty_email: &str) -> AppResult<Vec<AssignedSubject>>;
    /// 提交一个单元
    async fn submit_unit(&self, payload: &UnitPayload) -> AppResult<()>;
    /// 更新出题任务状态
    async fn update_assignment_status(&self, update: &StatusUpdate) -> AppResult<()>;
}

/// 基于 reqwest 的后端客户端
pub struct QuestionBankClient {
    http: Client,
    base_url: String,
}

impl QuestionBankClient {
    /// 创建新的题库客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        Self::with_base_url(&config.api_base_url, config.request_timeout())
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> AppResult<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn build_form(payload: &UnitPayload) -> AppResult<Form> {
        let mut form = Form::new()
            .text("subject_code", payload.subject_code.clone())
            .text("subject_name", payload.subject_name.clone())
            .text("semester", payload.semester.to_string())
            .text("question_number", payload.question_number.clone())
            .text("question_text", payload.question_text.clone())
            .text("co", payload.co.clone())
            .text("level", payload.level.clone())
            .text("marks", payload.marks.to_string())
            .text("faculty_email", payload.faculty_email.clone())
            .text("exam_type", payload.exam_type.clone());

        if let Some(image) = &payload.image {
            let part = Part::bytes(image.bytes.clone())
                .file_name(image.name.clone())
                .mime_str(&image.mime)?;
            form = form.part("image", part);
        }
        Ok(form)
    }

    /// 非 2xx 响应转成错误，带上响应体方便定位
    async fn check(endpoint: &str, response: Response) -> AppResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.ok().filter(|b| !b.is_empty());
        Err(AppError::bad_response(endpoint, status.as_u16(), body))
    }
}

#[async_trait]
impl QuestionBankApi for QuestionBankClient {
    async fn fetch_subject_codes(&self, faculty_email: &str) -> AppResult<Vec<AssignedSubject>> {
        let endpoint = format!("/faculty/subject-codes/{}", faculty_email);
        debug!("查询分配科目: {}", endpoint);

        let response = self.http.get(self.url(&endpoint)).send().await?;
        let response = Self::check(&endpoint, response).await?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn submit_unit(&self, payload: &UnitPayload) -> AppResult<()> {
        let endpoint = "/question-bank";
        debug!("提交题目 {} ({} 分)", payload.question_number, payload.marks);

        let form = Self::build_form(payload)?;
        let response = self
            .http
            .post(self.url(endpoint))
            .multipart(form)
            .send()
            .await?;
        Self::check(endpoint, response).await?;
        Ok(())
    }

    async fn update_assignment_status(&self, update: &StatusUpdate) -> AppResult<()> {
        let endpoint = "/assignments/update-status";
        let response = self
            .http
            .post(self.url(endpoint))
            .json(update)
            .send()
            .await?;
        Self::check(endpoint, response).await?;
        Ok(())
    }
}
