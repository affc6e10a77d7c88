pub mod constants;

mod coordination_driver;
pub use coordination_driver::*;

mod coordinated_registry;
pub use coordinated_registry::*;

pub mod error;
pub use error::RegistryError;

mod in_memory_coordinator;
pub use in_memory_coordinator::*;

mod load_balancer;
pub use load_balancer::*;

mod registry_config;
pub use registry_config::*;
