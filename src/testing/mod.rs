mod streams;

pub use streams::{ArStream, NormalStream};
