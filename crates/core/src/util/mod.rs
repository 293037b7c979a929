pub mod retry;
pub mod rolling_window;

pub use retry::{is_http_retryable, Backoff};
pub use rolling_window::RollingWindow;
