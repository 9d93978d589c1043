//! `agentswarm init` - write an example swarm configuration.

use anyhow::{bail, Result};

use super::{config_path, AppContext};
use crate::cli::output;

const EXAMPLE_CONFIG: &str = r#"agents:
  codex:
    instances: 2
    resources:
      memory: "2GB"
      timeout: "30m"
    tasks:
      - code_generation
      - testing
  claude:
    instances: 1
    resources:
      memory: "1GB"
      timeout: "30m"
    tasks:
      - architecture_review
      - documentation

deployment:
  strategy: parallel
  max_concurrent: 8
  timeout: 30m

metadata:
  created_by: agentswarm
  schema: v1
"#;

pub async fn handle_init(ctx: &AppContext, force: bool) -> Result<()> {
    let path = config_path(&ctx.project_root);
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    std::fs::write(&path, EXAMPLE_CONFIG)?;
    output::success(&format!("Wrote example configuration to {}", path.display()));
    Ok(())
}
