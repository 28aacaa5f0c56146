pub mod cv;
pub mod usage;
pub mod user;
