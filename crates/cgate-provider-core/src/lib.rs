//! Core provider abstractions for the gateway.
//!
//! This crate intentionally does **not** depend on axum or any concrete HTTP
//! client. Provider implementations (`cgate-provider-impl`) construct
//! [`executor::UpstreamHttpRequest`]-shaped calls and drive them with a real
//! client; this crate only defines the data model, the Error Classifier, the
//! Account Arbiter, and the traits a higher layer wires together.

pub mod arbiter;
pub mod classify;
pub mod errors;
pub mod executor;
pub mod headers;
pub mod model;
pub mod refresh;
pub mod registry;
pub mod store;

pub use arbiter::{Arbiter, MarkUnavailableOutcome, SelectOutcome};
pub use classify::{classify, ClassifierConfig, ClassifyDecision};
pub use errors::{ProviderError, ProviderResult};
pub use executor::{execute_with_base_url_fallback, Executor, ExecutorFailure, ExecutorRequest, EventStream};
pub use headers::{header_get, header_remove, header_set, Headers};
pub use model::{
    now_millis, AuthType, Combo, Connection, ConnectionId, CursorFrameFlags, FallbackStrategy,
    InstantMillis, Patch, Provider, ProviderConfig, ProviderSpecificData, Settings, StreamEvent,
    TestStatus, UnknownProvider,
};
pub use refresh::{needs_refresh, refresh_with_retry, RefreshedTokens, TokenRefresher};
pub use registry::ProviderRegistry;
pub use store::{ConnectionFilter, ConnectionPatch, CredentialStore, StorageError};
