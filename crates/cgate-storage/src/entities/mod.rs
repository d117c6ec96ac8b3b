pub mod combos;
pub mod connections;
pub mod global_config;

pub use combos::Entity as Combos;
pub use connections::Entity as Connections;
pub use global_config::Entity as GlobalConfig;
