//! 试卷状态机
//!
//! ```text
//! Empty ──编辑──▶ Editing ──提交──▶ Submitting ──全部成功──▶ Submitted
//!   ▲                │  ▲                │
//!   └────清空草稿────┘  └────校验/提交失败──┘
//! ```

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaperState {
    #[default]
    Empty,
    Editing,
    Submitting,
    /// 终态
    Submitted,
}

impl PaperState {
    pub fn can_edit(self) -> bool {
        matches!(self, PaperState::Empty | PaperState::Editing)
    }

    /// 任何一次成功的编辑
    pub fn on_edit(self) -> Self {
        match self {
            PaperState::Empty => PaperState::Editing,
            other => other,
        }
    }

    pub fn on_clear(self) -> Self {
        match self {
            PaperState::Editing => PaperState::Empty,
            other => other,
        }
    }

    pub fn on_submit_start(self) -> Self {
        match self {
            PaperState::Empty | PaperState::Editing => PaperState::Submitting,
            other => other,
        }
    }

    pub fn on_submit_finished(self, success: bool) -> Self {
        match (self, success) {
            (PaperState::Submitting, true) => PaperState::Submitted,
            (PaperState::Submitting, false) => PaperState::Editing,
            (other, _) => other,
        }
    }
}

impl fmt::Display for PaperState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PaperState::Empty => "EMPTY",
            PaperState::Editing => "EDITING",
            PaperState::Submitting => "SUBMITTING",
            PaperState::Submitted => "SUBMITTED",
        };
        f.write_str(name)
    }
}
