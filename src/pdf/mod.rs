pub mod reader;

pub use reader::{read_pages, read_pages_mem};
