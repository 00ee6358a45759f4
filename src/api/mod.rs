mod http;
mod provider;

pub use http::HttpProvider;
pub use provider::BetProvider;
