pub mod greeting;
pub mod health;

pub use greeting::hello;
pub use health::health_check;
