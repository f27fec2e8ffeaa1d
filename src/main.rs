use anyhow::Context;
use staybook_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load Staybook settings")?;
    staybook_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        journal = ?settings.database.journal_dir,
        "staybook-app bootstrap starting"
    );

    staybook_app::run(settings).await
}
