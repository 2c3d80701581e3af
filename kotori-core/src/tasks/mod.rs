pub mod history_maintenance;
