pub mod callback_reporter;
pub mod controller_driver;
pub mod question_store;

pub use callback_reporter::CallbackReporter;
pub use controller_driver::{ControllerDriver, DriverSettings, DriverTiming, ResourcePage, UiConventions};
pub use question_store::{QuestionStore, Ticket};
