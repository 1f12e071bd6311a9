//! Built-in fusion backends.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

mod dldt;
mod elementwise;

pub use dldt::{DldtBackend, DLDT_EXCLUDED_OPS, DLDT_FUSABLE_OPS};
pub use elementwise::ElementwiseBackend;
