pub mod event;
pub mod procurement;
pub mod step;
pub mod user;
