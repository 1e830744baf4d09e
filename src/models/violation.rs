use thiserror::Error;

/// 提交前校验失败的原因
///
/// `question` 是展示用的题号（"3"、"Q5"），`unit` 带小题号（"3b"、"Q5a"）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("请填写科目{field}")]
    MissingSubject { field: &'static str },
    #[error("题目 {question} 缺少题干")]
    MissingText { question: String },
    #[error("题目 {question} 的分值必须为 20 分（当前 {marks} 分）")]
    MarksNotFull { question: String, marks: u32 },
    #[error("题目 {question} 未选择 CO 或认知层级")]
    MissingCoOrLevel { question: String },
    #[error("小题 {unit} 缺少题干")]
    MissingSubText { unit: String },
    #[error("题目 {question} 的小题分值合计必须为 20 分（当前 {total} 分）")]
    SubMarksNotFull { question: String, total: u32 },
    #[error("题目 {question} 已拆分为小题，主题干必须为空")]
    ParentTextPresent { question: String },
}
