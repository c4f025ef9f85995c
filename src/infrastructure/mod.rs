pub mod http;
pub mod in_memory;
pub mod sensors;
pub mod session;
