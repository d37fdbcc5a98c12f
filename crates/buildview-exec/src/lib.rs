pub mod contracts;
pub mod executor;
pub mod queue;
pub mod session;

pub use contracts::*;
pub use executor::*;
pub use queue::*;
pub use session::*;
