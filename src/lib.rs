pub mod constants;
pub mod frame;
pub mod payload;
pub mod rpc;
pub mod utils;
