pub mod record_parser;
pub mod hit_reducer;
pub mod top_hits;

pub use record_parser::{parse_line, ReportLine};
pub use hit_reducer::{HitReader, HitReducer, ReducerState};
pub use top_hits::TopHits;
