use flarewatch_core::Config;

// mimalloc keeps fragmentation low for the buffered upload and result bodies.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    let (_state, router) = flarewatch_api::setup::initialize_app(config.clone())?;

    flarewatch_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
