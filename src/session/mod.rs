pub mod announcer;
pub mod result;
pub mod setup;
pub mod spelling;
pub mod typing;
