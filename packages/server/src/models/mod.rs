pub mod dashboard;
pub mod shared;
pub mod upstream;
