//! Models runnable by the engine.

mod linear;

pub use linear::LinearRegression;
