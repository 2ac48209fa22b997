mod store;

pub use store::{JsonStore, STATE_DIR};
