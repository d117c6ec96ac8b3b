//! Concrete [`Executor`](cgate_provider_core::Executor) implementations: the
//! Cursor binary codec, a uniform HTTP/JSON executor for every other
//! provider, their OAuth token refreshers, and the registry that wires them
//! all to a [`ProviderRegistry`](cgate_provider_core::ProviderRegistry).

pub mod client;
pub mod cursor;
pub mod http;
pub mod jyh;
pub mod refresh;
pub mod registry;

pub use cursor::CursorExecutor;
pub use http::UniformHttpExecutor;
pub use registry::build_registry;
