pub mod clear_cache;
pub mod extract;
pub mod status;
