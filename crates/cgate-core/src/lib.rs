pub mod assemble;
pub mod auth;
pub mod bootstrap;
pub mod core;
pub mod dispatch;
pub mod error;
pub mod handler;

pub use auth::{
    AuthContext, AuthError, AuthKeyEntry, AuthProvider, AuthSnapshot, MemoryAuth, NoopAuth,
    UserEntry,
};
pub use bootstrap::{
    bootstrap, bootstrap_with_args, default_provider_configs, hash_admin_key, merge_global_config,
    Bootstrapped, CliArgs,
};
pub use core::{Core, CoreState};
pub use dispatch::{handle_chat, split_provider_model, DispatchSuccess};
pub use error::{ApiError, ApiErrorKind};
