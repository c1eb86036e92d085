pub mod bucket_service;
pub mod credential_store;
pub mod metadata_store;
pub mod object_lifecycle;
pub mod path_resolver;
pub mod saga;
