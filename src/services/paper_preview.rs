//! 试卷预览 - 业务能力层
//!
//! 把草稿渲染成纯文本，BE/MTECH 按模块分组，MBA 平铺 8 道题。

use std::fmt::Write as _;

use crate::models::{ExamType, Question, QuestionBody, QuestionPaperDraft};

/// 渲染预览文本
pub fn render_preview(draft: &QuestionPaperDraft) -> String {
    let mut out = String::new();
    let subject = &draft.subject;
    let semester = subject
        .semester
        .map(|s| s.to_string())
        .unwrap_or_else(|| "-".to_string());

    let _ = writeln!(out, "{} - {} (Semester {})", subject.code, subject.name, semester);
    let _ = writeln!(out, "Exam: {}", draft.exam_type);
    let _ = writeln!(out, "Course outcomes: {}", draft.course_outcomes.join(", "));
    if !draft.instructions.trim().is_empty() {
        let _ = writeln!(out, "Instructions: {}", draft.instructions.trim());
    }

    match draft.exam_type {
        ExamType::BeMtech => {
            for (i, module) in draft.modules.iter().enumerate() {
                let _ = writeln!(out);
                if module.title.trim().is_empty() {
                    let _ = writeln!(out, "Module {}", i + 1);
                } else {
                    let _ = writeln!(out, "Module {}: {}", i + 1, module.title.trim());
                }
                for question in &module.questions {
                    render_question(&mut out, draft, question);
                }
            }
        }
        ExamType::Mba => {
            let _ = writeln!(out);
            for question in &draft.mba_questions {
                render_question(&mut out, draft, question);
            }
        }
    }
    out
}

fn render_question(out: &mut String, draft: &QuestionPaperDraft, question: &Question) {
    let label = draft.display_label(question);
    let tags = format!("[{} | {}]", dash_if_empty(&question.co), dash_if_empty(&question.level));
    let image = question
        .image
        .as_ref()
        .map(|a| format!(" <img: {}>", a.name()))
        .unwrap_or_default();

    match &question.body {
        QuestionBody::Simple { text, marks } => {
            let _ = writeln!(out, "{}. {} ({} marks) {}{}", label, dash_if_empty(text), marks, tags, image);
        }
        QuestionBody::Split { sub_questions } => {
            let _ = writeln!(out, "{}. {}{}", label, tags, image);
            for sub in sub_questions {
                let marks = sub
                    .marks
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "-".to_string());
                let sub_image = sub
                    .image
                    .as_ref()
                    .map(|a| format!(" <img: {}>", a.name()))
                    .unwrap_or_default();
                let _ = writeln!(
                    out,
                    "   {}) {} ({} marks){}",
                    sub.label,
                    dash_if_empty(&sub.text),
                    marks,
                    sub_image
                );
            }
        }
    }
}

fn dash_if_empty(value: &str) -> &str {
    if value.trim().is_empty() {
        "-"
    } else {
        value
    }
}
