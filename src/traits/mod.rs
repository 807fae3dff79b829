mod dispose;
mod resolver;

pub use dispose::{Dispose, DisposeResult};
pub use resolver::{Locator, LocatorCore};
