pub mod error;
pub mod group;
pub mod ids;
pub mod index;
pub mod repository;
pub mod store;
pub mod user;
