// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod http_source;
pub mod record_mapper;
pub mod waypoint_source;
