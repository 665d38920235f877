pub mod block_loop;
pub mod controller;
