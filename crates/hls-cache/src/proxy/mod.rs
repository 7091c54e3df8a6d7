//! # Proxy Module
//!
//! The local reverse-proxy surface: URL mapping, range resolution and the
//! serving endpoint itself.

pub mod range;
pub mod server;
pub mod token;

pub use range::{RangeOutcome, resolve_range};
pub use server::HlsCacheProxy;
pub use token::{PROXY_PATH_PREFIX, ProxyUrlMapper};
