pub mod auth;
pub mod checkout;
pub mod error;
pub mod http;
pub mod local_store;
pub mod model;
pub mod sqlite_storage;
pub mod storage;
pub mod sync;
pub mod tracker;
