use std::sync::Arc;

use minihttp::catalog::Catalog;
use minihttp::config::Config;
use minihttp::handlers::{json_handler, static_route};
use minihttp::router::Router;
use serde_json::{json, Value};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Config::load()?;
    minihttp::logging::init(&cfg)?;

    let mut router = Router::new();
    router.get(
        "/hello",
        json_handler(|_| async { Ok::<_, anyhow::Error>(json!({ "user": "madokast" })) }),
    );
    router.post(
        "/hello2",
        json_handler(|obj: Option<Value>| async move {
            let name = obj
                .as_ref()
                .and_then(|o| o.get("name"))
                .and_then(Value::as_str)
                .unwrap_or("default")
                .to_string();
            Ok::<_, anyhow::Error>(json!({ "hello": name }))
        }),
    );

    if let Some(static_cfg) = &cfg.static_files {
        router.add_route(static_route(static_cfg.path_prefix.clone(), static_cfg.root.clone()));
    }

    if let Some(catalog_cfg) = &cfg.catalog {
        let catalog = Arc::new(Catalog::from_config(catalog_cfg)?);
        catalog.register_routes(&mut router, &catalog_cfg.path_prefix);
    }

    minihttp::server::run(&cfg.server, router).await
}
