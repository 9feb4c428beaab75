pub mod chart;
pub mod check;
pub mod rows;
pub mod summary;
pub mod update;

mod source;
