pub mod commcell;
pub mod core;
pub mod mock;
