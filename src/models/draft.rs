use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::question::{sub_label, Question, QuestionBody, FULL_MARKS};

/// 模块数上限（BE/MTECH）
pub const MAX_MODULES: usize = 5;
/// CO 数上限
pub const MAX_COURSE_OUTCOMES: usize = 5;
/// MBA 试卷固定题数
pub const MBA_QUESTION_COUNT: usize = 8;

/// 试卷类型，决定题目结构
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExamType {
    /// 按模块出题，每模块两道大题
    #[serde(rename = "BE_MTECH")]
    BeMtech,
    /// 固定 8 道大题
    #[serde(rename = "MBA")]
    Mba,
}

impl ExamType {
    pub fn as_str(self) -> &'static str {
        match self {
            ExamType::BeMtech => "BE_MTECH",
            ExamType::Mba => "MBA",
        }
    }

    /// 每道大题最多几个小题
    pub fn max_sub_questions(self) -> usize {
        match self {
            ExamType::BeMtech => 4,
            ExamType::Mba => 3,
        }
    }

    /// 提交时题号前缀（MBA 为 "Q3b" 形式）
    pub fn number_prefix(self) -> &'static str {
        match self {
            ExamType::BeMtech => "",
            ExamType::Mba => "Q",
        }
    }
}

impl std::fmt::Display for ExamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 科目信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectInfo {
    pub code: String,
    pub name: String,
    /// 1..8，未选择时为 None
    pub semester: Option<u8>,
}

/// BE/MTECH 的一个模块，固定两道大题
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub title: String,
    pub questions: [Question; 2],
}

impl Module {
    /// 第 `position` 个模块（从 0 开始），题号为 2k-1 和 2k
    pub fn numbered(position: usize) -> Self {
        let mut module = Self {
            title: String::new(),
            questions: [Question::new(""), Question::new("")],
        };
        module.renumber(position);
        module
    }

    pub fn renumber(&mut self, position: usize) {
        let first = position * 2 + 1;
        self.questions[0].label = first.to_string();
        self.questions[1].label = (first + 1).to_string();
    }
}

/// 草稿结构不符合编辑器能产生的形态（只会出现在外部读入的记录里）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("模块数 {count} 超过上限 {max}")]
    TooManyModules { count: usize, max: usize },
    #[error("{exam_type} 试卷应有 {expected} 道独立大题，实际 {count} 道")]
    QuestionCount {
        exam_type: ExamType,
        expected: usize,
        count: usize,
    },
    #[error("{exam_type} 试卷不应包含模块")]
    UnexpectedModules { exam_type: ExamType },
    #[error("CO 数量 {count} 不在 1..={max} 之间")]
    CourseOutcomeCount { count: usize, max: usize },
    #[error("学期 {0} 不在 1..=8 之间")]
    Semester(u8),
    #[error("题号应为 {expected}，实际为 {found}")]
    QuestionLabel { expected: String, found: String },
    #[error("题目 {question} 有 {count} 个小题，上限 {max}")]
    TooManySubQuestions {
        question: String,
        count: usize,
        max: usize,
    },
    #[error("题目 {question} 的小题标号应为 {expected}，实际为 {found}")]
    SubQuestionLabel {
        question: String,
        expected: String,
        found: String,
    },
    #[error("题目 {question} 的小题分值合计 {total} 超过 20 分")]
    SubMarksOverflow { question: String, total: u32 },
    #[error("题目 {question} 固定为 20 分，记录中为 {marks} 分")]
    FixedMarks { question: String, marks: u32 },
}

/// 正在编辑的试卷草稿
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPaperDraft {
    #[serde(default)]
    pub subject: SubjectInfo,
    #[serde(default)]
    pub instructions: String,
    pub course_outcomes: Vec<String>,
    pub exam_type: ExamType,
    #[serde(default)]
    pub modules: Vec<Module>,
    #[serde(default)]
    pub mba_questions: Vec<Question>,
    #[serde(default)]
    pub is_submitted: bool,
    #[serde(default)]
    pub last_saved_at: Option<DateTime<Utc>>,
}

impl QuestionPaperDraft {
    pub fn new(exam_type: ExamType) -> Self {
        let mba_questions = match exam_type {
            ExamType::BeMtech => Vec::new(),
            ExamType::Mba => (1..=MBA_QUESTION_COUNT)
                .map(|n| Question::new(n.to_string()))
                .collect(),
        };
        Self {
            subject: SubjectInfo::default(),
            instructions: String::new(),
            course_outcomes: vec!["CO1".to_string()],
            exam_type,
            modules: Vec::new(),
            mba_questions,
            is_submitted: false,
            last_saved_at: None,
        }
    }

    /// 按试卷顺序遍历所有大题
    pub fn questions(&self) -> Box<dyn Iterator<Item = &Question> + '_> {
        match self.exam_type {
            ExamType::BeMtech => Box::new(self.modules.iter().flat_map(|m| m.questions.iter())),
            ExamType::Mba => Box::new(self.mba_questions.iter()),
        }
    }

    /// 展示用题号，MBA 带 "Q" 前缀
    pub fn display_label(&self, question: &Question) -> String {
        format!("{}{}", self.exam_type.number_prefix(), question.label)
    }

    /// 与新建草稿相比是否有任何内容
    pub fn is_blank(&self) -> bool {
        let fresh = Self::new(self.exam_type);
        self.subject == fresh.subject
            && self.instructions == fresh.instructions
            && self.course_outcomes == fresh.course_outcomes
            && self.modules == fresh.modules
            && self.mba_questions == fresh.mba_questions
    }
}

impl QuestionPaperDraft {
    /// 检查外部读入的草稿是否处于编辑器可达的形态
    ///
    /// 只检查结构上限和编号，不检查是否填写完整（那是提交前校验的事）。
    pub fn check_shape(&self) -> Result<(), ShapeError> {
        let outcomes = self.course_outcomes.len();
        if outcomes == 0 || outcomes > MAX_COURSE_OUTCOMES {
            return Err(ShapeError::CourseOutcomeCount {
                count: outcomes,
                max: MAX_COURSE_OUTCOMES,
            });
        }
        if let Some(semester) = self.subject.semester {
            if !(1..=8).contains(&semester) {
                return Err(ShapeError::Semester(semester));
            }
        }

        match self.exam_type {
            ExamType::BeMtech => {
                if self.modules.len() > MAX_MODULES {
                    return Err(ShapeError::TooManyModules {
                        count: self.modules.len(),
                        max: MAX_MODULES,
                    });
                }
                if !self.mba_questions.is_empty() {
                    return Err(ShapeError::QuestionCount {
                        exam_type: self.exam_type,
                        expected: 0,
                        count: self.mba_questions.len(),
                    });
                }
            }
            ExamType::Mba => {
                if !self.modules.is_empty() {
                    return Err(ShapeError::UnexpectedModules {
                        exam_type: self.exam_type,
                    });
                }
                if self.mba_questions.len() != MBA_QUESTION_COUNT {
                    return Err(ShapeError::QuestionCount {
                        exam_type: self.exam_type,
                        expected: MBA_QUESTION_COUNT,
                        count: self.mba_questions.len(),
                    });
                }
            }
        }

        for (index, question) in self.questions().enumerate() {
            let expected = (index + 1).to_string();
            if question.label != expected {
                return Err(ShapeError::QuestionLabel {
                    expected,
                    found: question.label.clone(),
                });
            }
            self.check_question(question)?;
        }
        Ok(())
    }

    fn check_question(&self, question: &Question) -> Result<(), ShapeError> {
        let label = self.display_label(question);
        match &question.body {
            QuestionBody::Simple { marks, .. } => {
                if self.exam_type == ExamType::Mba && *marks != FULL_MARKS {
                    return Err(ShapeError::FixedMarks {
                        question: label,
                        marks: *marks,
                    });
                }
            }
            QuestionBody::Split { sub_questions } => {
                let max = self.exam_type.max_sub_questions();
                if sub_questions.len() > max {
                    return Err(ShapeError::TooManySubQuestions {
                        question: label,
                        count: sub_questions.len(),
                        max,
                    });
                }
                for (i, sub) in sub_questions.iter().enumerate() {
                    let expected = sub_label(i);
                    if sub.label != expected {
                        return Err(ShapeError::SubQuestionLabel {
                            question: label,
                            expected,
                            found: sub.label.clone(),
                        });
                    }
                }
                let total = question.body.sub_marks_total();
                if total > FULL_MARKS {
                    return Err(ShapeError::SubMarksOverflow {
                        question: label,
                        total,
                    });
                }
            }
        }
        Ok(())
    }
}
