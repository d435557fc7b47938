mod closed_loop;
mod fault_handling;
mod properties;
mod telemetry_log;
