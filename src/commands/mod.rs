pub mod backup;
pub mod deploy;
pub mod import;
pub mod reindex;
pub mod restore;
pub mod service;
