pub mod kind;
pub mod record;
pub mod session;
