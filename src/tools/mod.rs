//! Small helpers shared by the integrations.

use bytes::Bytes;
use futures_util::Stream;
use std::pin::Pin;

pub mod system;

/// A pinned, boxed byte stream, as accepted by streaming uploads.
pub type PinnedBytesStream =
    Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Unpin + Send>>;
