// Purpose - external file formats feeding the engines

pub mod wav;

pub use wav::{decode, decode_reader, DecodedSample};
