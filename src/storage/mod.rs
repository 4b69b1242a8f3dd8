pub mod collection;
pub mod db;
pub mod error;
pub mod ledger;
pub mod media;
pub mod repository;
pub(crate) mod schema;
