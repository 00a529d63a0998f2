pub mod aggregate;
pub mod batch;
pub mod parse;
pub mod polyline;
pub mod project;
pub mod segment;
pub mod stats;
pub mod streams;
