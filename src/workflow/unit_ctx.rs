//! 提交单元上下文
//!
//! 封装"我正在提交哪个科目的第几题"这一信息

use std::fmt::Display;

#[derive(Debug, Clone)]
pub struct UnitCtx {
    /// 科目代码
    pub subject_code: String,

    /// 合成题号（"1a"、"Q3"）
    pub question_number: String,

    /// 本次提交中的序号（从1开始）
    pub position: usize,

    /// 单元总数
    pub total: usize,
}

impl UnitCtx {
    pub fn new(
        subject_code: impl Into<String>,
        question_number: impl Into<String>,
        position: usize,
        total: usize,
    ) -> Self {
        Self {
            subject_code: subject_code.into(),
            question_number: question_number.into(),
            position,
            total,
        }
    }
}

impl Display for UnitCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[科目 {} 题目#{} {}/{}]",
            self.subject_code, self.question_number, self.position, self.total
        )
    }
}
