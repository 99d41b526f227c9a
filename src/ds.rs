mod default_buf;
mod nset;

pub use default_buf::DefaultBuf;
pub use nset::{Indexed, Iter, NSet};
