use serde::{Deserialize, Serialize};

use crate::models::attachment::Attachment;
use crate::models::violation::Violation;

/// 每道大题的满分
pub const FULL_MARKS: u32 = 20;

/// 第 `index` 个小题的标号（0 → "a"）
pub fn sub_label(index: usize) -> String {
    char::from(b'a' + index as u8).to_string()
}

/// 小题
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubQuestion {
    pub label: String,
    #[serde(default)]
    pub text: String,
    /// 未填写时为 None（表单里的空字符串）
    #[serde(default, deserialize_with = "deserialize_marks")]
    pub marks: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Attachment>,
}

impl SubQuestion {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: String::new(),
            marks: None,
            image: None,
        }
    }
}

/// 题目的两种形态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionMode {
    /// 直接带题干和分值
    Simple,
    /// 分值拆分到小题上
    Split,
}

/// 题干部分：整题或拆分为小题，二者互斥
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionBody {
    Simple { text: String, marks: u32 },
    /// 小题列表永不为空
    Split { sub_questions: Vec<SubQuestion> },
}

impl Default for QuestionBody {
    fn default() -> Self {
        Self::Simple {
            text: String::new(),
            marks: FULL_MARKS,
        }
    }
}

impl QuestionBody {
    pub fn mode(&self) -> QuestionMode {
        match self {
            QuestionBody::Simple { .. } => QuestionMode::Simple,
            QuestionBody::Split { .. } => QuestionMode::Split,
        }
    }

    /// 形态切换的唯一入口
    ///
    /// Simple → Split：丢弃题干和分值，生成小题 a；
    /// Split → Simple：丢弃所有小题，分值恢复为 20。
    /// 已经是目标形态时不做任何事，返回 false。
    pub fn switch_mode(&mut self, target: QuestionMode) -> bool {
        if self.mode() == target {
            return false;
        }
        *self = match target {
            QuestionMode::Simple => QuestionBody::default(),
            QuestionMode::Split => QuestionBody::Split {
                sub_questions: vec![SubQuestion::new(sub_label(0))],
            },
        };
        true
    }

    pub fn sub_questions(&self) -> &[SubQuestion] {
        match self {
            QuestionBody::Simple { .. } => &[],
            QuestionBody::Split { sub_questions } => sub_questions,
        }
    }

    /// 已填写的小题分值合计
    pub fn sub_marks_total(&self) -> u32 {
        self.sub_questions()
            .iter()
            .filter_map(|sub| sub.marks)
            .fold(0, u32::saturating_add)
    }
}

/// 大题（BE/MTECH 模块内的题，或 MBA 的 8 道题之一）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QuestionRecord", into = "QuestionRecord")]
pub struct Question {
    /// 题号："1".."10"（BE/MTECH）或 "1".."8"（MBA）
    pub label: String,
    pub co: String,
    pub level: String,
    pub image: Option<Attachment>,
    pub body: QuestionBody,
}

impl Question {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            co: String::new(),
            level: String::new(),
            image: None,
            body: QuestionBody::default(),
        }
    }

    pub fn mode(&self) -> QuestionMode {
        self.body.mode()
    }
}

/// 草稿 JSON 中题目的扁平形态
///
/// 兼容旧草稿：`text`/`marks`/`subQuestions` 并列存放。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    pub label: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, deserialize_with = "deserialize_marks")]
    pub marks: Option<u32>,
    #[serde(default)]
    pub co: String,
    #[serde(default)]
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Attachment>,
    #[serde(default)]
    pub sub_questions: Vec<SubQuestion>,
}

impl TryFrom<QuestionRecord> for Question {
    type Error = Violation;

    fn try_from(record: QuestionRecord) -> Result<Self, Self::Error> {
        let body = if record.sub_questions.is_empty() {
            QuestionBody::Simple {
                text: record.text,
                marks: record.marks.unwrap_or(FULL_MARKS),
            }
        } else if !record.text.trim().is_empty() {
            return Err(Violation::ParentTextPresent {
                question: record.label,
            });
        } else {
            QuestionBody::Split {
                sub_questions: record.sub_questions,
            }
        };

        Ok(Self {
            label: record.label,
            co: record.co,
            level: record.level,
            image: record.image,
            body,
        })
    }
}

impl From<Question> for QuestionRecord {
    fn from(question: Question) -> Self {
        let (text, marks, sub_questions) = match question.body {
            QuestionBody::Simple { text, marks } => (text, Some(marks), Vec::new()),
            QuestionBody::Split { sub_questions } => (String::new(), None, sub_questions),
        };
        Self {
            label: question.label,
            text,
            marks,
            co: question.co,
            level: question.level,
            image: question.image,
            sub_questions,
        }
    }
}

// 分值可能是数字、数字字符串或空字符串
fn deserialize_marks<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Visitor;
    use std::fmt;

    struct MarksVisitor;

    impl<'de> Visitor<'de> for MarksVisitor {
        type Value = Option<u32>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a non-negative integer, a numeric string or an empty string")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<u32>()
                .map(Some)
                .map_err(|_| E::invalid_value(serde::de::Unexpected::Str(value), &self))
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            u32::try_from(value)
                .map(Some)
                .map_err(|_| E::invalid_value(serde::de::Unexpected::Unsigned(value), &self))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            u32::try_from(value)
                .map(Some)
                .map_err(|_| E::invalid_value(serde::de::Unexpected::Signed(value), &self))
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(None)
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(MarksVisitor)
}
