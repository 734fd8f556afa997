//! Column/row tables for the tabular sink

use serde::Serialize;
use std::fs;
use std::path::PathBuf;

use super::TableSink;
use crate::error::{Error, Result};
use crate::vector::AttributeValue;

/// A rectangular table of attribute values
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<AttributeValue>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    /// Append a row; its length must match the column count.
    pub fn push_row(&mut self, row: Vec<AttributeValue>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::InvalidInput(format!(
                "row has {} values, table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column by name
    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// Writes each table as `<dir>/<name>.json`
#[derive(Debug, Clone)]
pub struct JsonTableSink {
    dir: PathBuf,
}

impl JsonTableSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl TableSink for JsonTableSink {
    fn write_table(&mut self, name: &str, table: &Table) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{}.json", name));
        let text = serde_json::to_string_pretty(table)?;
        fs::write(&path, text)?;
        tracing::debug!(path = %path.display(), rows = table.len(), "table written");
        Ok(())
    }
}
