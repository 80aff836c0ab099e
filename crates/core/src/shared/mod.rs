pub mod constants;
pub mod frame;
pub mod region;
pub mod worker;
