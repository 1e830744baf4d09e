pub mod attachment_codec;
pub mod draft_repository;
pub mod paper_preview;
pub mod submission;
pub mod validation;

pub use attachment_codec::AttachmentError;
pub use draft_repository::DraftRepository;
pub use paper_preview::render_preview;
pub use submission::{plan_units, SubmissionFailure, SubmissionService, SubmissionUnit};
pub use validation::{collect_violations, validate};
