pub mod proof;
pub mod receipt;
