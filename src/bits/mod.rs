pub mod array;
pub mod vector;

pub use array::{build_cos_table, BitArray};
pub use vector::{hamming_distance, BitVector};
