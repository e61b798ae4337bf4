use std::path::Path;

use anyhow::{Context, bail};
use serde_json::{Map, Value};

use crate::util;

/// One row of a task table, with its columns as they were read.
pub type TaskRecord = Map<String, Value>;

const TASK_COLUMN: &str = "task";
const WORKLOAD_COLUMN: &str = "workload";
pub const LABEL_COLUMN: &str = "label";

/// Task records together with their parsed workloads.
///
/// Column names are matched case-insensitively, so `Task`, `TASK` and `task`
/// are all accepted. Columns other than task and workload are carried through
/// to the report unchanged.
#[derive(Debug, Clone)]
pub struct TaskTable {
    records: Vec<TaskRecord>,
    workloads: Vec<f64>,
}

impl TaskTable {
    pub fn open<P>(path: P) -> anyhow::Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let records = util::read_json_file::<Vec<TaskRecord>, _>("task table", path)?;
        Self::from_records(records)
            .with_context(|| format!("Invalid task table: {}", path.display()))
    }

    pub fn from_records(records: Vec<TaskRecord>) -> anyhow::Result<Self> {
        let Some(first) = records.first() else {
            bail!("Task table is empty");
        };
        let (Some(_), Some(workload_key)) = (
            find_column(first, TASK_COLUMN),
            find_column(first, WORKLOAD_COLUMN),
        ) else {
            bail!("Task table columns must contain 'Task' and 'Workload'");
        };
        let workload_key = workload_key.to_owned();

        let workloads = records
            .iter()
            .enumerate()
            .map(|(row, record)| {
                let value = record
                    .get(&workload_key)
                    .with_context(|| format!("Row {row}: missing workload"))?;
                parse_workload(value).with_context(|| format!("Row {row}: invalid workload"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self { records, workloads })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn workloads(&self) -> &[f64] {
        &self.workloads
    }

    /// Adds the `label` column to every record.
    ///
    /// # Panics
    ///
    /// Panics if `assignment` does not have one label per record.
    pub fn into_labeled_records(self, assignment: &[u32]) -> Vec<TaskRecord> {
        assert_eq!(self.records.len(), assignment.len());
        self.records
            .into_iter()
            .zip(assignment)
            .map(|(mut record, &label)| {
                record.insert(LABEL_COLUMN.to_owned(), Value::from(label));
                record
            })
            .collect()
    }
}

fn find_column<'a>(record: &'a TaskRecord, name: &str) -> Option<&'a str> {
    record
        .keys()
        .find(|key| key.eq_ignore_ascii_case(name))
        .map(String::as_str)
}

fn parse_workload(value: &Value) -> anyhow::Result<f64> {
    let workload = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    workload.with_context(|| format!("workload is not numeric: {value}"))
}
