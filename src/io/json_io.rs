use std::fs;
use std::io;
use std::path::Path;

use serde_json::Value;
use thiserror::Error;

use crate::state::data_model::{Row, TableData};

#[derive(Debug, Error)]
pub enum JsonIoError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("JSON root is not an array")]
    NotAnArray,
    #[error("JSON array contains non-object elements")]
    NotArrayOfObjects,
}

/// Loads a fetched data set: a JSON array of row objects.
pub fn load_rows(path: &Path) -> Result<TableData, JsonIoError> {
    let content = fs::read_to_string(path)?;
    parse_rows(&content)
}

pub fn parse_rows(content: &str) -> Result<TableData, JsonIoError> {
    let value: Value = serde_json::from_str(content)?;

    match value {
        Value::Array(arr) => {
            let mut rows = Vec::with_capacity(arr.len());
            for item in arr {
                match item {
                    Value::Object(map) => {
                        rows.push(map.into_iter().collect::<Row>());
                    }
                    _ => return Err(JsonIoError::NotArrayOfObjects),
                }
            }
            Ok(rows)
        }
        _ => Err(JsonIoError::NotAnArray),
    }
}
