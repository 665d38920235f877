pub mod format_resolver;
pub mod gain;
pub mod ring_buffer;
