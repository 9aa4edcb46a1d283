mod config;
mod deploy;
mod deps;
mod descriptor;
mod invoke;
mod resources;

pub use config::cmd_config;
pub use deploy::cmd_deploy;
pub use deps::cmd_deps;
pub use descriptor::cmd_descriptor;
pub use invoke::cmd_invoke;
pub use resources::cmd_resources;

use std::path::Path;

/// Application name for a descriptor: its file name without extension.
fn application_name(descriptor: &Path) -> String {
  descriptor
    .file_stem()
    .map(|stem| stem.to_string_lossy().into_owned())
    .unwrap_or_else(|| "app".to_string())
}
