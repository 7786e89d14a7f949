pub mod error;
pub mod line_item;
pub mod traits;
pub mod types;

pub use error::*;
pub use line_item::*;
pub use traits::*;
pub use types::*;
