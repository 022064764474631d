pub mod backtest;
pub mod market;
pub mod options;
pub mod signals;

pub use backtest::*;
pub use market::*;
pub use options::*;
pub use signals::*;
