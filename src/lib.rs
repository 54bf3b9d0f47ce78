// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod challenge;
pub mod checks;
pub mod config;
pub mod logging;
pub mod remote;
pub mod results;
pub mod runtime;
pub mod util;
