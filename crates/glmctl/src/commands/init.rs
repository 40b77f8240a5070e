use anyhow::Result;
use std::path::Path;

pub(crate) const DEFAULT_CONFIG: &str = r#"# glmctl configuration

[provider]
model = "glm-4-flash"
base_url = "https://open.bigmodel.cn/api/paas/v4"
# Leave empty to read the key from api_key_env
api_key = ""
api_key_env = "LLM_API_KEY"
timeout_secs = 120

[request]
# max_tokens = 1024
# temperature = 0.7
# top_p = 0.9
"#;

/// Initialize a new config file
pub fn run_init(path: &Path) -> Result<()> {
    if path.exists() {
        anyhow::bail!("Config already exists at {:?}", path);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, DEFAULT_CONFIG)?;
    println!("Created config at {:?}", path);
    Ok(())
}
