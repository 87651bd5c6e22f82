pub use iec21_core::error::{Iec21Error, Iec21Result};
