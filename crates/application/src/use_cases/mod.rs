pub mod dns;

pub use dns::QueryEngine;
