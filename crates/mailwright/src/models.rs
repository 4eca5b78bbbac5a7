pub mod draft;
pub mod email;
pub mod event;
