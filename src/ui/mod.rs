pub mod report;
pub mod style;

pub use report::render;
