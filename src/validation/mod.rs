pub mod baseline;
pub mod classify;
pub mod similarity;
