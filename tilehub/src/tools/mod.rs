pub mod flush;
pub mod serve;
