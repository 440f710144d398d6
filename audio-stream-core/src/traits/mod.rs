pub mod capture_source;
pub mod clip_allocator;
pub mod track_delegate;
pub mod transport_engine;
