mod process_query;

pub use process_query::QueryEngine;
