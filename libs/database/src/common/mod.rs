//! Types shared by every database backend in this crate

pub mod error;

pub use error::{DatabaseError, DatabaseResult};
