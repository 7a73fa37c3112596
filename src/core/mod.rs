pub mod codec;
pub mod pool;
pub mod postings;
pub mod skip_list;
mod term;

pub use term::Term;
