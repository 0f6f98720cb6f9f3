//! Base types and error handling.
//!
//! - [`NetError`](neterror::NetError): dial and pool errors, carrying
//!   transport I/O errors verbatim

pub mod neterror;
