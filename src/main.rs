/// DisTim server binary
use anyhow::Context;
use distim::{config::ServerConfig, context::AppContext, server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "distim=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("DISTIM_LOG_FORMAT").as_deref() == Ok("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    print_banner();

    let config = ServerConfig::from_env().context("failed to load configuration")?;
    let ctx = AppContext::new(config)
        .await
        .context("failed to initialize application context")?;

    server::serve(ctx).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
    ____  _     _______
   / __ \(_)___/_  __(_)___ ___
  / / / / / ___// / / / __ `__ \
 / /_/ / (__  )/ / / / / / / / /
/_____/_/____//_/ /_/_/ /_/ /_/

        Cultural QR totems v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
