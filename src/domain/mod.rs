pub mod draft;
pub mod reference;
pub mod session;
pub mod ticket;
