pub mod dashboard;
pub mod upstream;
