pub mod metadata;
pub mod retention;
pub mod search;
pub mod signature;
pub mod storage;
pub mod upload_service;
pub mod worker;
