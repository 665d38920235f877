pub mod capture_device;
pub mod platform;
pub mod render_device;
pub mod route_sink;
