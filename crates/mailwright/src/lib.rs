pub mod classifier;
pub mod client;
pub mod composer;
pub mod errors;
pub mod extraction;
pub mod generator;
pub mod models;
pub mod prompt_template;
pub mod providers;
pub mod sse;
pub mod store;
