pub mod sale;
pub mod sync;
