//! Connected peers and their outbound channels

pub mod registry;

pub use registry::ConnectionRegistry;
