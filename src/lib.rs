pub mod ae;
pub mod dict;
pub mod error;
pub mod log;
pub mod util;
