pub mod division_report;
pub mod task_table;
