//! Static file serving.
//!
//! `GET {prefix}/a/b/c.ext` is answered with the bytes of `{root}/a/b/c.ext`.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{debug, warn};

use crate::http::mime;
use crate::http::request::{Method, Request};
use crate::http::response::{Response, ResponseBuilder, StatusCode};
use crate::router::{Handler, Route};

#[derive(Debug)]
struct StaticDir {
    prefix: String,
    root: PathBuf,
}

impl StaticDir {
    /// Maps a request path onto a file below `root`.
    fn resolve(&self, request_path: &str) -> Result<PathBuf> {
        let relative = request_path
            .strip_prefix(&self.prefix)
            .context("request path outside static prefix")?
            .trim_start_matches('/');

        let relative = Path::new(relative);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            bail!("refusing static path {request_path:?}");
        }

        Ok(self.root.join(relative))
    }

    async fn serve(&self, request: &Request) -> Result<Response> {
        let file = self.resolve(&request.path)?;

        let content_type = mime::from_path(&file).unwrap_or_else(|| {
            warn!(path = %file.display(), "Unknown static resource type");
            mime::OCTET_STREAM
        });

        let data = tokio::fs::read(&file)
            .await
            .with_context(|| format!("read static resource {}", file.display()))?;

        debug!(path = %file.display(), bytes = data.len(), "Serving static resource");

        Ok(ResponseBuilder::new(StatusCode::Ok)
            .header("Content-Type", content_type)
            .body(data)
            .build())
    }
}

/// Handler serving files below `root` for paths under `path_prefix`.
///
/// A missing file is a handler failure, not a 404.
pub fn static_files(path_prefix: impl Into<String>, root: impl Into<PathBuf>) -> impl Handler {
    let dir = Arc::new(StaticDir {
        prefix: path_prefix.into(),
        root: root.into(),
    });

    move |req: Request| {
        let dir = Arc::clone(&dir);
        async move { dir.serve(&req).await }
    }
}

/// `GET` route for [`static_files`].
pub fn static_route(path_prefix: impl Into<String>, root: impl Into<PathBuf>) -> Route {
    let path_prefix = path_prefix.into();
    Route::new(Method::GET, path_prefix.clone(), static_files(path_prefix, root))
}
