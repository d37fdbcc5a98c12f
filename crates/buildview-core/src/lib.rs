pub mod actions;
pub mod config;
pub mod error;
pub mod history;
pub mod keyboard;
pub mod output;
pub mod reducer;
pub mod routes;
pub mod scroll;
pub mod state;

pub use actions::*;
pub use config::*;
pub use error::*;
pub use history::*;
pub use keyboard::*;
pub use output::*;
pub use reducer::*;
pub use routes::*;
pub use scroll::*;
pub use state::*;
