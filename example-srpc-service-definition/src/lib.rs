mod greeter;
pub use greeter::*;
