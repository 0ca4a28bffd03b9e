pub mod api;
pub mod dimension;
pub mod report;

pub use api::*;
pub use dimension::*;
pub use report::*;
