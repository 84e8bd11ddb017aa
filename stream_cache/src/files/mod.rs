mod byte_source;
mod cached_stream_reader;
mod mock_source;

pub use byte_source::ByteSource;
pub use byte_source::StreamSource;
pub use cached_stream_reader::CachedStreamReader;
pub use mock_source::MockSource;
