pub mod convert;
pub mod output;
pub mod stream;
