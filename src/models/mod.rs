pub mod listing;
pub mod vacancy;
