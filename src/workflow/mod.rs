pub mod draft_store;
pub mod paper_state;
pub mod unit_ctx;

pub use draft_store::{DraftStore, FieldUpdate, QuestionAddr, Rejection};
pub use paper_state::PaperState;
pub use unit_ctx::UnitCtx;
