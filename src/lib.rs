pub mod analysis;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod explain;
pub mod graph;
pub mod layout;
pub mod normalize;
pub mod util;
