mod interceptor;
mod reqwest_transport;

pub use interceptor::*;
pub use reqwest_transport::*;
