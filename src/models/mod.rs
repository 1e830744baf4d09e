pub mod attachment;
pub mod draft;
pub mod question;
pub mod subject;
pub mod violation;

pub use attachment::{Attachment, EncodedImage, RawImage};
pub use draft::{ExamType, Module, QuestionPaperDraft, ShapeError, SubjectInfo};
pub use question::{Question, QuestionBody, QuestionMode, QuestionRecord, SubQuestion, FULL_MARKS};
pub use subject::AssignedSubject;
pub use violation::Violation;
