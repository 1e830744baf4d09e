//! 草稿编辑 - 流程层
//!
//! 持有当前会话唯一的一份草稿树，所有编辑都经过这里。
//! 每个操作要么完整生效，要么返回 [`Rejection`] 且草稿保持原样；
//! 试卷提交后所有操作都被拒绝。

use std::fmt;

use thiserror::Error;

use crate::models::question::sub_label;
use crate::models::{
    draft::{MAX_COURSE_OUTCOMES, MAX_MODULES},
    Attachment, ExamType, Module, Question, QuestionBody, QuestionMode, QuestionPaperDraft,
    SubQuestion, SubjectInfo, FULL_MARKS,
};

/// 编辑被拒绝的原因（展示给用户的提示）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("试卷已提交，不能再修改")]
    Submitted,
    #[error("最多只能添加 {max} 个模块")]
    ModuleLimit { max: usize },
    #[error("题目 {question} 最多只能有 {max} 个小题")]
    SubQuestionLimit { question: String, max: usize },
    #[error("最多只能添加 {max} 个 CO")]
    CourseOutcomeLimit { max: usize },
    #[error("至少需要保留一个 CO")]
    LastCourseOutcome,
    #[error("题目 {question} 已拆分为小题，请在小题中填写{field}")]
    SplitQuestionField {
        question: String,
        field: &'static str,
    },
    #[error("题目 {question} 固定为 20 分，不能修改分值")]
    FixedMarks { question: String },
    #[error("题目 {question} 的小题分值合计不能超过 20 分（修改后为 {total} 分）")]
    MarksOverflow { question: String, total: u32 },
    #[error("题目不存在: {0}")]
    NoSuchQuestion(QuestionAddr),
    #[error("题目 {question} 没有第 {index} 个小题")]
    NoSuchSubQuestion { question: String, index: usize },
    #[error("模块不存在: {0}")]
    NoSuchModule(usize),
    #[error("学期必须在 1 到 8 之间（收到 {0}）")]
    InvalidSemester(u8),
    #[error("科目 {0} 不在分配给您的科目中")]
    UnknownSubject(String),
    #[error("科目 {0} 的试卷已经提交过")]
    SubjectAlreadySubmitted(String),
    #[error("试卷正在提交，请稍候")]
    SubmissionInProgress,
    #[error("长时间无操作已登出，请重新登录")]
    LoggedOut,
}

/// 大题地址
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionAddr {
    /// BE/MTECH：模块下标 + 模块内题目下标（0 或 1），均从 0 开始
    Module { module: usize, question: usize },
    /// MBA：题号 1..8
    Mba { number: usize },
}

impl fmt::Display for QuestionAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionAddr::Module { module, question } => {
                write!(f, "模块 {} 第 {} 题", module + 1, question + 1)
            }
            QuestionAddr::Mba { number } => write!(f, "Q{}", number),
        }
    }
}

/// 对大题某个字段的修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    Text(String),
    Marks(u32),
    Co(String),
    Level(String),
    Image(Option<Attachment>),
}

/// 草稿编辑器
#[derive(Debug, Clone)]
pub struct DraftStore {
    draft: QuestionPaperDraft,
}

impl DraftStore {
    pub fn new(exam_type: ExamType) -> Self {
        Self {
            draft: QuestionPaperDraft::new(exam_type),
        }
    }

    pub fn from_draft(draft: QuestionPaperDraft) -> Self {
        Self { draft }
    }

    pub fn draft(&self) -> &QuestionPaperDraft {
        &self.draft
    }

    pub fn exam_type(&self) -> ExamType {
        self.draft.exam_type
    }

    pub fn is_submitted(&self) -> bool {
        self.draft.is_submitted
    }

    /// 标记为已提交（终态）
    pub fn mark_submitted(&mut self) {
        self.draft.is_submitted = true;
    }

    // ========== 科目与说明 ==========

    pub fn set_subject(&mut self, subject: SubjectInfo) -> Result<(), Rejection> {
        self.ensure_editable()?;
        if let Some(semester) = subject.semester {
            if !(1..=8).contains(&semester) {
                return Err(Rejection::InvalidSemester(semester));
            }
        }
        self.draft.subject = subject;
        Ok(())
    }

    pub fn set_instructions(&mut self, instructions: impl Into<String>) -> Result<(), Rejection> {
        self.ensure_editable()?;
        self.draft.instructions = instructions.into();
        Ok(())
    }

    // ========== CO ==========

    pub fn add_course_outcome(&mut self) -> Result<(), Rejection> {
        self.ensure_editable()?;
        let count = self.draft.course_outcomes.len();
        if count >= MAX_COURSE_OUTCOMES {
            return Err(Rejection::CourseOutcomeLimit {
                max: MAX_COURSE_OUTCOMES,
            });
        }
        self.draft.course_outcomes.push(format!("CO{}", count + 1));
        Ok(())
    }

    /// 删除最后一个 CO，引用它的题目同时清空 CO
    pub fn remove_course_outcome(&mut self) -> Result<(), Rejection> {
        self.ensure_editable()?;
        if self.draft.course_outcomes.len() <= 1 {
            return Err(Rejection::LastCourseOutcome);
        }
        if let Some(removed) = self.draft.course_outcomes.pop() {
            for question in self.questions_mut() {
                if question.co == removed {
                    question.co.clear();
                }
            }
        }
        Ok(())
    }

    // ========== 模块（BE/MTECH） ==========

    pub fn add_module(&mut self) -> Result<(), Rejection> {
        self.ensure_editable()?;
        let count = self.draft.modules.len();
        if count >= MAX_MODULES {
            return Err(Rejection::ModuleLimit { max: MAX_MODULES });
        }
        self.draft.modules.push(Module::numbered(count));
        Ok(())
    }

    /// 删除模块，后面的题目重新编号
    pub fn remove_module(&mut self, index: usize) -> Result<(), Rejection> {
        self.ensure_editable()?;
        if index >= self.draft.modules.len() {
            return Err(Rejection::NoSuchModule(index));
        }
        self.draft.modules.remove(index);
        for (position, module) in self.draft.modules.iter_mut().enumerate().skip(index) {
            module.renumber(position);
        }
        Ok(())
    }

    pub fn set_module_title(&mut self, index: usize, title: impl Into<String>) -> Result<(), Rejection> {
        self.ensure_editable()?;
        let module = self
            .draft
            .modules
            .get_mut(index)
            .ok_or(Rejection::NoSuchModule(index))?;
        module.title = title.into();
        Ok(())
    }

    // ========== 大题 ==========

    pub fn question(&self, addr: QuestionAddr) -> Option<&Question> {
        match (self.draft.exam_type, addr) {
            (ExamType::BeMtech, QuestionAddr::Module { module, question }) => self
                .draft
                .modules
                .get(module)
                .and_then(|m| m.questions.get(question)),
            (ExamType::Mba, QuestionAddr::Mba { number }) => number
                .checked_sub(1)
                .and_then(|i| self.draft.mba_questions.get(i)),
            _ => None,
        }
    }

    pub fn update_question_field(
        &mut self,
        addr: QuestionAddr,
        update: FieldUpdate,
    ) -> Result<(), Rejection> {
        self.ensure_editable()?;
        let exam_type = self.draft.exam_type;
        let question = self.question_mut(addr)?;

        match update {
            FieldUpdate::Text(value) => match &mut question.body {
                QuestionBody::Simple { text, .. } => *text = value,
                QuestionBody::Split { .. } => {
                    return Err(Rejection::SplitQuestionField {
                        question: question.label.clone(),
                        field: "题干",
                    })
                }
            },
            FieldUpdate::Marks(value) => {
                if exam_type == ExamType::Mba {
                    return Err(Rejection::FixedMarks {
                        question: question.label.clone(),
                    });
                }
                match &mut question.body {
                    QuestionBody::Simple { marks, .. } => *marks = value,
                    QuestionBody::Split { .. } => {
                        return Err(Rejection::SplitQuestionField {
                            question: question.label.clone(),
                            field: "分值",
                        })
                    }
                }
            }
            FieldUpdate::Co(value) => question.co = value,
            FieldUpdate::Level(value) => question.level = value,
            FieldUpdate::Image(value) => question.image = value,
        }
        Ok(())
    }

    /// 添加小题；整题第一次添加小题时题干和分值一并清除
    pub fn add_sub_question(&mut self, addr: QuestionAddr) -> Result<(), Rejection> {
        self.ensure_editable()?;
        let max = self.draft.exam_type.max_sub_questions();
        let question = self.question_mut(addr)?;

        if question.body.switch_mode(QuestionMode::Split) {
            return Ok(());
        }
        if let QuestionBody::Split { sub_questions } = &mut question.body {
            if sub_questions.len() >= max {
                return Err(Rejection::SubQuestionLimit {
                    question: question.label.clone(),
                    max,
                });
            }
            let label = sub_label(sub_questions.len());
            sub_questions.push(SubQuestion::new(label));
        }
        Ok(())
    }

    /// 删除小题并重新编号；删掉最后一个时恢复为整题
    pub fn remove_sub_question(&mut self, addr: QuestionAddr, index: usize) -> Result<(), Rejection> {
        self.ensure_editable()?;
        let question = self.question_mut(addr)?;
        let count = question.body.sub_questions().len();
        if index >= count {
            return Err(Rejection::NoSuchSubQuestion {
                question: question.label.clone(),
                index,
            });
        }

        if count == 1 {
            question.body.switch_mode(QuestionMode::Simple);
        } else if let QuestionBody::Split { sub_questions } = &mut question.body {
            sub_questions.remove(index);
            for (i, sub) in sub_questions.iter_mut().enumerate() {
                sub.label = sub_label(i);
            }
        }
        Ok(())
    }

    /// 小题 → 整题，分值恢复为 20；本来就是整题时返回 false
    pub fn convert_to_main_question(&mut self, addr: QuestionAddr) -> Result<bool, Rejection> {
        self.ensure_editable()?;
        let question = self.question_mut(addr)?;
        Ok(question.body.switch_mode(QuestionMode::Simple))
    }

    // ========== 小题 ==========

    pub fn update_sub_question_text(
        &mut self,
        addr: QuestionAddr,
        index: usize,
        text: impl Into<String>,
    ) -> Result<(), Rejection> {
        self.ensure_editable()?;
        self.sub_question_mut(addr, index)?.text = text.into();
        Ok(())
    }

    pub fn set_sub_question_image(
        &mut self,
        addr: QuestionAddr,
        index: usize,
        image: Option<Attachment>,
    ) -> Result<(), Rejection> {
        self.ensure_editable()?;
        self.sub_question_mut(addr, index)?.image = image;
        Ok(())
    }

    /// 修改小题分值；同级小题合计超过 20 分时拒绝
    ///
    /// 合计低于 20 分是允许的，满分要求只在提交前校验。
    pub fn update_sub_question_marks(
        &mut self,
        addr: QuestionAddr,
        index: usize,
        marks: Option<u32>,
    ) -> Result<(), Rejection> {
        self.ensure_editable()?;
        let question = self.question_mut(addr)?;
        let subs = question.body.sub_questions();
        if index >= subs.len() {
            return Err(Rejection::NoSuchSubQuestion {
                question: question.label.clone(),
                index,
            });
        }

        let others: u32 = subs
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .filter_map(|(_, sub)| sub.marks)
            .sum();
        let total = others.saturating_add(marks.unwrap_or(0));
        if total > FULL_MARKS {
            return Err(Rejection::MarksOverflow {
                question: question.label.clone(),
                total,
            });
        }

        if let QuestionBody::Split { sub_questions } = &mut question.body {
            sub_questions[index].marks = marks;
        }
        Ok(())
    }

    // ========== 整体 ==========

    /// 丢弃全部内容，回到同类型的空白草稿
    pub fn clear(&mut self) -> Result<(), Rejection> {
        self.ensure_editable()?;
        self.draft = QuestionPaperDraft::new(self.draft.exam_type);
        Ok(())
    }

    fn ensure_editable(&self) -> Result<(), Rejection> {
        if self.draft.is_submitted {
            Err(Rejection::Submitted)
        } else {
            Ok(())
        }
    }

    fn question_mut(&mut self, addr: QuestionAddr) -> Result<&mut Question, Rejection> {
        let found = match (self.draft.exam_type, addr) {
            (ExamType::BeMtech, QuestionAddr::Module { module, question }) => self
                .draft
                .modules
                .get_mut(module)
                .and_then(|m| m.questions.get_mut(question)),
            (ExamType::Mba, QuestionAddr::Mba { number }) => match number.checked_sub(1) {
                Some(i) => self.draft.mba_questions.get_mut(i),
                None => None,
            },
            _ => None,
        };
        found.ok_or(Rejection::NoSuchQuestion(addr))
    }

    fn sub_question_mut(&mut self, addr: QuestionAddr, index: usize) -> Result<&mut SubQuestion, Rejection> {
        let question = self.question_mut(addr)?;
        let label = question.label.clone();
        let found = match &mut question.body {
            QuestionBody::Split { sub_questions } => sub_questions.get_mut(index),
            QuestionBody::Simple { .. } => None,
        };
        found.ok_or(Rejection::NoSuchSubQuestion {
            question: label,
            index,
        })
    }

    fn questions_mut(&mut self) -> impl Iterator<Item = &mut Question> {
        self.draft
            .modules
            .iter_mut()
            .flat_map(|m| m.questions.iter_mut())
            .chain(self.draft.mba_questions.iter_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawImage;

    const Q1: QuestionAddr = QuestionAddr::Module {
        module: 0,
        question: 0,
    };

    fn be_store() -> DraftStore {
        let mut store = DraftStore::new(ExamType::BeMtech);
        store.add_module().unwrap();
        store
    }

    /// 互斥不变量：拆分后没有题干，整题时没有小题
    fn assert_exclusive(question: &Question) {
        match &question.body {
            QuestionBody::Simple { .. } => assert!(question.body.sub_questions().is_empty()),
            QuestionBody::Split { sub_questions } => assert!(!sub_questions.is_empty()),
        }
    }

    #[test]
    fn test_add_module_caps_at_five() {
        let mut store = DraftStore::new(ExamType::BeMtech);
        for _ in 0..5 {
            store.add_module().unwrap();
        }
        assert_eq!(store.add_module(), Err(Rejection::ModuleLimit { max: 5 }));
        assert_eq!(store.draft().modules.len(), 5);

        let labels: Vec<_> = store.draft().questions().map(|q| q.label.clone()).collect();
        assert_eq!(labels, vec!["1", "2", "3", "4", "5", "6", "7", "8", "9", "10"]);
    }

    #[test]
    fn test_remove_module_renumbers() {
        let mut store = DraftStore::new(ExamType::BeMtech);
        for _ in 0..3 {
            store.add_module().unwrap();
        }
        store.remove_module(0).unwrap();
        assert_eq!(store.draft().modules[0].questions[0].label, "1");
        assert_eq!(store.draft().modules[1].questions[1].label, "4");
        assert_eq!(store.remove_module(7), Err(Rejection::NoSuchModule(7)));
    }

    #[test]
    fn test_first_sub_question_clears_text_and_marks() {
        let mut store = be_store();
        store
            .update_question_field(Q1, FieldUpdate::Text("Explain deadlock".into()))
            .unwrap();
        store.add_sub_question(Q1).unwrap();

        let question = store.question(Q1).unwrap();
        assert_eq!(question.mode(), QuestionMode::Split);
        assert_eq!(question.body.sub_questions()[0].label, "a");
        assert_eq!(question.body.sub_questions()[0].marks, None);
        assert_exclusive(question);
    }

    #[test]
    fn test_sub_question_caps_per_exam_type() {
        let mut store = be_store();
        for _ in 0..4 {
            store.add_sub_question(Q1).unwrap();
        }
        assert!(matches!(
            store.add_sub_question(Q1),
            Err(Rejection::SubQuestionLimit { max: 4, .. })
        ));
        let labels: Vec<_> = store
            .question(Q1)
            .unwrap()
            .body
            .sub_questions()
            .iter()
            .map(|s| s.label.as_str())
            .collect();
        assert_eq!(labels, vec!["a", "b", "c", "d"]);

        let mut mba = DraftStore::new(ExamType::Mba);
        let q3 = QuestionAddr::Mba { number: 3 };
        for _ in 0..3 {
            mba.add_sub_question(q3).unwrap();
        }
        assert!(matches!(
            mba.add_sub_question(q3),
            Err(Rejection::SubQuestionLimit { max: 3, .. })
        ));
    }

    #[test]
    fn test_split_question_rejects_text_and_marks() {
        let mut store = be_store();
        store.add_sub_question(Q1).unwrap();
        let before = store.draft().clone();

        assert!(matches!(
            store.update_question_field(Q1, FieldUpdate::Text("x".into())),
            Err(Rejection::SplitQuestionField { field: "题干", .. })
        ));
        assert!(matches!(
            store.update_question_field(Q1, FieldUpdate::Marks(20)),
            Err(Rejection::SplitQuestionField { field: "分值", .. })
        ));
        assert_eq!(store.draft(), &before);

        // CO 和层级对整题生效
        store
            .update_question_field(Q1, FieldUpdate::Co("CO1".into()))
            .unwrap();
        store
            .update_question_field(Q1, FieldUpdate::Level("L3".into()))
            .unwrap();
        assert_eq!(store.question(Q1).unwrap().co, "CO1");
    }

    #[test]
    fn test_mba_marks_are_fixed() {
        let mut store = DraftStore::new(ExamType::Mba);
        let q1 = QuestionAddr::Mba { number: 1 };
        assert!(matches!(
            store.update_question_field(q1, FieldUpdate::Marks(15)),
            Err(Rejection::FixedMarks { .. })
        ));
        assert!(matches!(
            store.update_question_field(QuestionAddr::Mba { number: 9 }, FieldUpdate::Co("CO1".into())),
            Err(Rejection::NoSuchQuestion(_))
        ));
        assert!(matches!(
            store.update_question_field(QuestionAddr::Mba { number: 0 }, FieldUpdate::Co("CO1".into())),
            Err(Rejection::NoSuchQuestion(_))
        ));
    }

    #[test]
    fn test_convert_to_main_question_resets_marks() {
        let mut store = be_store();
        store
            .update_question_field(Q1, FieldUpdate::Marks(12))
            .unwrap();
        assert!(!store.convert_to_main_question(Q1).unwrap());

        store.add_sub_question(Q1).unwrap();
        store.add_sub_question(Q1).unwrap();
        assert!(store.convert_to_main_question(Q1).unwrap());
        assert_eq!(
            store.question(Q1).unwrap().body,
            QuestionBody::Simple {
                text: String::new(),
                marks: 20
            }
        );
    }

    #[test]
    fn test_sub_marks_never_exceed_full_marks() {
        let mut store = be_store();
        for _ in 0..3 {
            store.add_sub_question(Q1).unwrap();
        }
        let attempts = [
            (0, Some(8)),
            (1, Some(10)),
            (2, Some(5)),
            (2, Some(2)),
            (0, Some(9)),
            (1, None),
            (2, Some(11)),
            (0, Some(21)),
        ];
        for (index, marks) in attempts {
            let _ = store.update_sub_question_marks(Q1, index, marks);
            assert!(store.question(Q1).unwrap().body.sub_marks_total() <= 20);
        }

        let err = store.update_sub_question_marks(Q1, 0, Some(20)).unwrap_err();
        assert!(matches!(err, Rejection::MarksOverflow { .. }));
    }

    #[test]
    fn test_sub_marks_replace_own_value() {
        let mut store = be_store();
        store.add_sub_question(Q1).unwrap();
        store.add_sub_question(Q1).unwrap();
        store.update_sub_question_marks(Q1, 0, Some(15)).unwrap();
        store.update_sub_question_marks(Q1, 1, Some(5)).unwrap();
        // 替换自身的分值，而不是累加
        store.update_sub_question_marks(Q1, 0, Some(10)).unwrap();
        assert_eq!(store.question(Q1).unwrap().body.sub_marks_total(), 15);
    }

    #[test]
    fn test_remove_sub_question_relabels_and_reverts() {
        let mut store = be_store();
        for _ in 0..3 {
            store.add_sub_question(Q1).unwrap();
        }
        store.update_sub_question_text(Q1, 2, "third").unwrap();
        store.remove_sub_question(Q1, 0).unwrap();

        let subs = store.question(Q1).unwrap().body.sub_questions().to_vec();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[1].label, "b");
        assert_eq!(subs[1].text, "third");

        store.remove_sub_question(Q1, 0).unwrap();
        store.remove_sub_question(Q1, 0).unwrap();
        assert_eq!(store.question(Q1).unwrap().mode(), QuestionMode::Simple);
        assert_exclusive(store.question(Q1).unwrap());
    }

    #[test]
    fn test_course_outcomes() {
        let mut store = be_store();
        assert_eq!(store.remove_course_outcome(), Err(Rejection::LastCourseOutcome));
        for _ in 0..4 {
            store.add_course_outcome().unwrap();
        }
        assert_eq!(
            store.add_course_outcome(),
            Err(Rejection::CourseOutcomeLimit { max: 5 })
        );
        assert_eq!(store.draft().course_outcomes.last().unwrap(), "CO5");

        store
            .update_question_field(Q1, FieldUpdate::Co("CO5".into()))
            .unwrap();
        store.remove_course_outcome().unwrap();
        assert_eq!(store.question(Q1).unwrap().co, "");
    }

    #[test]
    fn test_semester_range() {
        let mut store = be_store();
        let subject = SubjectInfo {
            code: "CS501".into(),
            name: "Operating Systems".into(),
            semester: Some(9),
        };
        assert_eq!(store.set_subject(subject), Err(Rejection::InvalidSemester(9)));
        assert_eq!(store.draft().subject, SubjectInfo::default());
    }

    #[test]
    fn test_submitted_draft_is_frozen() {
        let mut store = be_store();
        store.add_sub_question(Q1).unwrap();
        store.mark_submitted();
        let before = store.draft().clone();

        let results = vec![
            store.add_module(),
            store.remove_module(0),
            store.set_module_title(0, "Memory"),
            store.add_sub_question(Q1),
            store.remove_sub_question(Q1, 0),
            store.convert_to_main_question(Q1).map(|_| ()),
            store.update_question_field(Q1, FieldUpdate::Co("CO1".into())),
            store.update_question_field(
                Q1,
                FieldUpdate::Image(Some(RawImage::new(vec![1], "a.png", "image/png").into())),
            ),
            store.update_sub_question_text(Q1, 0, "x"),
            store.update_sub_question_marks(Q1, 0, Some(5)),
            store.set_sub_question_image(Q1, 0, None),
            store.add_course_outcome(),
            store.remove_course_outcome(),
            store.set_instructions("none"),
            store.set_subject(SubjectInfo::default()),
            store.clear(),
        ];

        for result in results {
            assert_eq!(result, Err(Rejection::Submitted));
        }
        assert_eq!(store.draft(), &before);
    }

    #[test]
    fn test_wrong_addressing_for_exam_type() {
        let mut store = DraftStore::new(ExamType::Mba);
        assert!(matches!(
            store.add_sub_question(Q1),
            Err(Rejection::NoSuchQuestion(_))
        ));
    }
}
