/// Installs the process-wide `tracing` subscriber (console + rolling JSON file).
pub mod loggerlocal;
