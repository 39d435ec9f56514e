mod cache;
mod errors;
mod recursive;
mod tracker;
mod transport;
mod utils;

pub use cache::*;
pub use errors::*;
pub use recursive::*;
pub use tracker::*;
