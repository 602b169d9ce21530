mod common;
mod upstream;
