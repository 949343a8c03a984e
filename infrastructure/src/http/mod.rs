//! HTTP adapter for the remote query endpoint.
//!
//! - [`HttpQueryClient`]: `POST /query` with a streamed text body
//! - [`Utf8StreamDecoder`]: incremental UTF-8 decoding across chunk boundaries

mod client;
mod decoder;

pub use client::{DEFAULT_BASE_URL, HttpQueryClient, decode_text_stream};
pub use decoder::Utf8StreamDecoder;
