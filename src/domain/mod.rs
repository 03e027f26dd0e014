pub mod error;

// CSV conversion module
pub mod csv;
