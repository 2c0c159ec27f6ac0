use anyhow::Context;

use keystone_infra::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    keystone_observability::init();

    let config = Config::from_env().context("invalid configuration")?;
    tracing::info!(
        environment = %config.environment,
        data_dir = %config.data_dir.display(),
        "starting keystone"
    );

    keystone_api::server::run(config).await
}
