pub mod compose;
pub mod emails;
