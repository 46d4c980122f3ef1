pub mod chromium_session;
pub mod js_executor;

pub use chromium_session::ChromiumSession;
pub use js_executor::JsExecutor;
