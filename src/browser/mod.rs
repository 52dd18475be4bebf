pub mod chromium;
pub mod session;

pub use chromium::{ChromiumControl, ChromiumLauncher, ChromiumSession};
pub use session::{BrowserSession, Control, SessionLauncher};
