pub mod config_value;

pub use config_value::decode;
