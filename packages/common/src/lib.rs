pub mod error;
pub mod handle;
pub mod identity;
pub mod result;

pub use error::*;
pub use handle::{Handle, HandleRejection};
pub use identity::*;
pub use result::*;
