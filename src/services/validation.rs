//! 提交前校验 - 业务能力层
//!
//! 纯函数，只读草稿。草稿保存从不经过这里，只有最终提交才校验。

use crate::models::{QuestionBody, QuestionPaperDraft, Question, Violation, FULL_MARKS};

/// 快速失败：返回遇到的第一个问题
pub fn validate(draft: &QuestionPaperDraft) -> Result<(), Violation> {
    match violations(draft).next() {
        Some(violation) => Err(violation),
        None => Ok(()),
    }
}

/// 收集全部问题（供页面上的提示面板使用），顺序与 [`validate`] 一致
pub fn collect_violations(draft: &QuestionPaperDraft) -> Vec<Violation> {
    violations(draft).collect()
}

fn violations(draft: &QuestionPaperDraft) -> impl Iterator<Item = Violation> + '_ {
    subject_violations(draft)
        .into_iter()
        .chain(draft.questions().flat_map(move |q| question_violations(draft, q)))
}

fn subject_violations(draft: &QuestionPaperDraft) -> Vec<Violation> {
    let subject = &draft.subject;
    let mut found = Vec::new();
    if subject.code.trim().is_empty() {
        found.push(Violation::MissingSubject { field: "代码" });
    }
    if subject.name.trim().is_empty() {
        found.push(Violation::MissingSubject { field: "名称" });
    }
    if subject.semester.is_none() {
        found.push(Violation::MissingSubject { field: "学期" });
    }
    found
}

fn question_violations(draft: &QuestionPaperDraft, question: &Question) -> Vec<Violation> {
    let label = draft.display_label(question);
    let mut found = Vec::new();

    match &question.body {
        QuestionBody::Simple { text, marks } => {
            if text.trim().is_empty() {
                found.push(Violation::MissingText {
                    question: label.clone(),
                });
            }
            if *marks != FULL_MARKS {
                found.push(Violation::MarksNotFull {
                    question: label.clone(),
                    marks: *marks,
                });
            }
        }
        QuestionBody::Split { sub_questions } => {
            for sub in sub_questions {
                if sub.text.trim().is_empty() {
                    found.push(Violation::MissingSubText {
                        unit: format!("{}{}", label, sub.label),
                    });
                }
            }
            let total = question.body.sub_marks_total();
            if total != FULL_MARKS {
                found.push(Violation::SubMarksNotFull {
                    question: label.clone(),
                    total,
                });
            }
        }
    }

    // CO 和层级属于整道大题
    if question.co.trim().is_empty() || question.level.trim().is_empty() {
        found.push(Violation::MissingCoOrLevel { question: label });
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExamType, Question, QuestionRecord, SubQuestion, SubjectInfo};
    use crate::models::draft::Module;

    fn subject() -> SubjectInfo {
        SubjectInfo {
            code: "CS501".into(),
            name: "Operating Systems".into(),
            semester: Some(5),
        }
    }

    fn tagged(question: &mut Question) {
        question.co = "CO1".into();
        question.level = "L2".into();
    }

    /// 只有一个模块、第二题已填好的草稿，第一题由调用方设置
    fn draft_with(first: QuestionBody) -> QuestionPaperDraft {
        let mut draft = QuestionPaperDraft::new(ExamType::BeMtech);
        draft.subject = subject();
        let mut module = Module::numbered(0);
        for q in module.questions.iter_mut() {
            tagged(q);
        }
        module.questions[0].body = first;
        module.questions[1].body = QuestionBody::Simple {
            text: "Describe the process life cycle".into(),
            marks: 20,
        };
        draft.modules.push(module);
        draft
    }

    fn split(marks: &[u32]) -> QuestionBody {
        QuestionBody::Split {
            sub_questions: marks
                .iter()
                .enumerate()
                .map(|(i, m)| SubQuestion {
                    label: crate::models::question::sub_label(i),
                    text: format!("part {}", i + 1),
                    marks: Some(*m),
                    image: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_simple_question_with_full_marks_is_valid() {
        let draft = draft_with(QuestionBody::Simple {
            text: "Explain paging".into(),
            marks: 20,
        });
        assert_eq!(validate(&draft), Ok(()));
        assert!(collect_violations(&draft).is_empty());
    }

    #[test]
    fn test_simple_question_with_partial_marks_is_invalid() {
        let draft = draft_with(QuestionBody::Simple {
            text: "Explain paging".into(),
            marks: 15,
        });
        assert_eq!(
            validate(&draft),
            Err(Violation::MarksNotFull {
                question: "1".into(),
                marks: 15
            })
        );
    }

    #[test]
    fn test_split_question_summing_to_full_marks_is_valid() {
        let draft = draft_with(split(&[10, 6, 4]));
        assert_eq!(validate(&draft), Ok(()));
    }

    #[test]
    fn test_split_question_short_of_full_marks_is_invalid() {
        let draft = draft_with(split(&[10, 8]));
        assert_eq!(
            validate(&draft),
            Err(Violation::SubMarksNotFull {
                question: "1".into(),
                total: 18
            })
        );
    }

    #[test]
    fn test_split_question_with_parent_text_is_invalid() {
        let record = QuestionRecord {
            label: "1".into(),
            text: "stray parent text".into(),
            marks: None,
            co: "CO1".into(),
            level: "L2".into(),
            image: None,
            sub_questions: vec![SubQuestion {
                label: "a".into(),
                text: "part".into(),
                marks: Some(20),
                image: None,
            }],
        };
        assert_eq!(
            Question::try_from(record),
            Err(Violation::ParentTextPresent {
                question: "1".into()
            })
        );
    }

    #[test]
    fn test_missing_co_or_level_and_sub_text() {
        let mut draft = draft_with(split(&[12, 8]));
        draft.modules[0].questions[0].level.clear();
        if let QuestionBody::Split { sub_questions } = &mut draft.modules[0].questions[0].body {
            sub_questions[1].text.clear();
        }
        // 快速失败只报第一个
        assert_eq!(
            validate(&draft),
            Err(Violation::MissingSubText { unit: "1b".into() })
        );
        assert_eq!(
            collect_violations(&draft),
            vec![
                Violation::MissingSubText { unit: "1b".into() },
                Violation::MissingCoOrLevel {
                    question: "1".into()
                },
            ]
        );
    }

    #[test]
    fn test_subject_is_checked_first() {
        let mut draft = draft_with(QuestionBody::Simple {
            text: String::new(),
            marks: 20,
        });
        draft.subject.semester = None;
        assert_eq!(
            validate(&draft),
            Err(Violation::MissingSubject { field: "学期" })
        );
    }

    #[test]
    fn test_mba_labels_carry_prefix() {
        let mut draft = QuestionPaperDraft::new(ExamType::Mba);
        draft.subject = subject();
        for q in draft.mba_questions.iter_mut() {
            tagged(q);
            q.body = QuestionBody::Simple {
                text: "Discuss".into(),
                marks: 20,
            };
        }
        assert_eq!(validate(&draft), Ok(()));

        draft.mba_questions[4].body = split(&[5]);
        assert_eq!(
            validate(&draft),
            Err(Violation::SubMarksNotFull {
                question: "Q5".into(),
                total: 5
            })
        );
    }
}
