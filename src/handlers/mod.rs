pub mod health;
pub mod diagnostics;
pub mod execute;

pub use health::*;
pub use diagnostics::*;
pub use execute::*;
