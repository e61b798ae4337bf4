use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use workdiv_genetic::divider::{Division, GeneticDivider};

use super::task_table::{TaskRecord, TaskTable};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GroupSummary {
    pub group: u32,
    pub total_workload: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DivisionReport {
    pub divided_at: DateTime<Utc>,
    pub num_groups: u32,
    pub seed: u64,
    pub generations_run: usize,
    pub cancelled: bool,
    pub best_variance: f64,
    pub groups: Vec<GroupSummary>,
    pub tasks: Vec<TaskRecord>,
}

impl DivisionReport {
    pub fn new(
        divider: &GeneticDivider,
        division: &Division,
        seed: u64,
        table: TaskTable,
    ) -> Self {
        let groups = (1..=divider.num_groups())
            .zip(divider.group_totals(&division.assignment))
            .map(|(group, total)| GroupSummary {
                group,
                total_workload: round2(total),
            })
            .collect();
        Self {
            divided_at: Utc::now(),
            num_groups: divider.num_groups(),
            seed,
            generations_run: division.generations_run,
            cancelled: division.cancelled,
            best_variance: round2(division.variance),
            groups,
            tasks: table.into_labeled_records(&division.assignment),
        }
    }

    pub fn file_name(num_groups: u32) -> String {
        format!("Task_Division_N{num_groups}_Result.json")
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
