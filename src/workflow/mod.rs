pub mod question_ctx;
pub mod routine;
pub mod scratch;
pub mod suite;

pub use question_ctx::QuestionCtx;
pub use routine::{Routine, NEXT, UNRECOGNISED_SENDER};
pub use scratch::{ScratchValue, Scratchpad};
pub use suite::TestSuite;
