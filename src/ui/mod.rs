pub mod display;
pub mod lcd;
pub mod page;
pub mod session;

pub use display::{CharDisplay, ConsoleDisplay, DisplayError, MemoryDisplay};
pub use lcd::{AnimationTiming, Lcd, Line, Screen};
pub use page::{MenuEntry, Page, PageContext, Transition};
pub use session::AppSession;
