pub mod kubernetes;
pub mod method;
pub mod token;
