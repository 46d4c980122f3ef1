pub mod loaders;
pub mod question;
pub mod suite;

pub use loaders::load_toml;
pub use question::{
    AnswerId, AnswerOption, AnswerPayload, AnswerResponse, Question, QuestionView, ResourceRef,
    SlotStatus, TestType,
};
pub use suite::SuiteKind;
