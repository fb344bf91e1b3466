use financeflow::auth::IdentityClient;
use financeflow::config::Config;
use financeflow::db;
use tracing_subscriber::EnvFilter;

#[rocket::main]
async fn main() -> Result<(), rocket::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load();
    if let Some(dir) = config.db_path.parent() {
        std::fs::create_dir_all(dir).expect("create data directory");
    }
    let pool = db::init_db(&config.db_path);
    let identity = IdentityClient::new(config.identity_api_url, config.identity_api_key);

    financeflow::build(pool, identity).launch().await?;
    Ok(())
}
