use std::io::BufRead;
use std::path::{Path, PathBuf};

use crate::error::{PrismError, Result};
use crate::types::{ColumnSelection, Observation, WeightingMethod, NO_HITS};
use super::record_parser::{parse_line, ReportLine};

/// State carried forward from one report line to the next.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReducerState {
    /// Stem of the last declared database; `None` until one is declared.
    pub current_database: Option<String>,
    /// Text of the last `# Query:` line.
    pub current_query: String,
}

/// Turns classified report lines into weighted observations.
#[derive(Debug, Clone)]
pub struct HitReducer {
    state: ReducerState,
    weighting: WeightingMethod,
}

impl HitReducer {
    pub fn new(weighting: WeightingMethod) -> Self {
        Self {
            state: ReducerState::default(),
            weighting,
        }
    }

    pub fn state(&self) -> &ReducerState {
        &self.state
    }

    /// Applies one line. Declarations only update state; markers and hits
    /// emit an observation for the current query.
    pub fn consume(&mut self, line: ReportLine<'_>) -> Result<Option<Observation>> {
        match line {
            ReportLine::Database(db) => {
                self.state.current_database = Some(db.to_string());
                Ok(None)
            }
            ReportLine::Query(q) => {
                self.state.current_query = q.to_string();
                Ok(None)
            }
            ReportLine::NoHits => self.emit(NO_HITS, None).map(Some),
            ReportLine::Hit { query, locus } => self.emit(locus, Some(query)).map(Some),
            ReportLine::Ignored => Ok(None),
        }
    }

    fn emit(&self, locus: &str, column_query: Option<&str>) -> Result<Observation> {
        // uncommented reports have no `# Query:` lines, fall back to the query column
        let query = if self.state.current_query.is_empty() {
            column_query.unwrap_or("")
        } else {
            self.state.current_query.as_str()
        };
        let weight = self.weighting.weight_for(query)?;
        Ok(Observation {
            query: query.to_string(),
            database: self.state.current_database.clone(),
            locus: locus.to_string(),
            weight,
        })
    }
}

/// Streams the observations of one report. Ends at end of input.
pub struct HitReader<R: BufRead> {
    reader: R,
    path: PathBuf,
    columns: ColumnSelection,
    reducer: HitReducer,
    line: String,
    done: bool,
}

impl<R: BufRead> HitReader<R> {
    pub fn new<P: AsRef<Path>>(
        reader: R,
        path: P,
        weighting: WeightingMethod,
        columns: ColumnSelection,
    ) -> Self {
        Self {
            reader,
            path: path.as_ref().to_path_buf(),
            columns,
            reducer: HitReducer::new(weighting),
            line: String::new(),
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for HitReader<R> {
    type Item = Result<Observation>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => self.done = true,
                Ok(_) => {
                    let parsed = parse_line(&self.line, &self.columns);
                    match self.reducer.consume(parsed) {
                        Ok(Some(obs)) => return Some(Ok(obs)),
                        Ok(None) => {}
                        Err(e) => {
                            self.done = true;
                            return Some(Err(e));
                        }
                    }
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(PrismError::io(&self.path, e)));
                }
            }
        }
        None
    }
}
