pub mod credential;
pub mod ids;

pub use credential::*;
pub use ids::*;
