pub mod matrix;
pub mod mmap;
