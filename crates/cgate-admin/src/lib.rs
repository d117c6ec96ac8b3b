//! The admin CRUD surface: seeds and inspects the Credential Store
//! collaborator for tests and local runs. No rendering, no static asset
//! embedding.

mod router;

pub use router::router;
