//! Router (provider) protocol definitions.

mod traits;
mod registrar;
mod completion;

pub use traits::*;
pub use registrar::*;
pub use completion::*;
