mod mock;
pub mod parse;

pub use mock::{mock_vector, MockEmbeddings};
pub use parse::{decode_base64_f32, parse_indexed_data, parse_vector, parse_vectors};
