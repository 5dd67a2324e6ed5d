use serde_json::{json, Map, Value};

use crate::cli::OutputFormat;
use crate::config::AppConfig;

pub async fn handle(url: Option<String>, config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let base = url.unwrap_or_else(|| format!("http://{}", config.bind_addr()));
    let health_url = format!("{}/health", base.trim_end_matches('/'));

    let response = reqwest::get(&health_url).await?;
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);

    if !status.is_success() {
        anyhow::bail!("{} responded with {}", health_url, status);
    }

    let mut details = Map::new();
    details.insert("url".into(), json!(health_url));
    details.insert("status".into(), json!(status.as_u16()));
    details.insert("health".into(), body);
    println!("{}", output_format.render_success(&format!("{} is healthy", base), details));
    Ok(())
}
