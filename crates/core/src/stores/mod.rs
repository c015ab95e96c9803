mod http;
mod memory;

pub use http::HttpEmployeeStore;
pub use memory::InMemoryEmployeeStore;
