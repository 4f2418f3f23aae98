pub mod identity;
pub mod support_desk;

pub use identity::{IdentityService, TokenSource};
pub use support_desk::SupportDeskService;
