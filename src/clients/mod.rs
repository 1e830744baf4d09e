pub mod question_bank_client;

pub use question_bank_client::{QuestionBankApi, QuestionBankClient, StatusUpdate, UnitPayload};
