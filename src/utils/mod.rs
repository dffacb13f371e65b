pub mod keys;
pub mod slow_warn;
