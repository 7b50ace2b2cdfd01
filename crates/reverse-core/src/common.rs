pub mod codec;
pub mod error;

pub use codec::Marshaller;
pub use error::{Error, Result};
