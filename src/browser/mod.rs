pub mod chat;
pub mod chrome;
pub mod locator;
pub mod page;

pub use chat::{AssistantChat, ChatLocators};
pub use chrome::{ChromeDriver, ConnectionMode};
pub use locator::Locator;
pub use page::{ElementState, LocatorSnapshot, PageActions, PageState};
