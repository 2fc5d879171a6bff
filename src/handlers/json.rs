use std::future::Future;

use anyhow::Context;
use serde::Serialize;
use serde_json::Value;

use crate::http::request::Request;
use crate::http::response::Response;
use crate::router::Handler;

/// Wraps a value transform into a handler.
///
/// The request body is parsed as JSON and handed to `transform`, or `None`
/// when the body is empty. Whatever the transform returns is sent back as a
/// 200 JSON response.
///
/// ```ignore
/// router.get("/hello", json_handler(|_| async { Ok(json!({"user": "madokast"})) }));
/// ```
pub fn json_handler<F, Fut, T>(transform: F) -> impl Handler
where
    F: Fn(Option<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    T: Serialize + Send + 'static,
{
    move |req: Request| {
        let pending = parse_body(&req.body).map(&transform);
        async move {
            let value = pending?.await?;
            Ok::<_, anyhow::Error>(Response::ok_json(&value)?)
        }
    }
}

fn parse_body(body: &[u8]) -> anyhow::Result<Option<Value>> {
    if body.is_empty() {
        return Ok(None);
    }

    let value = serde_json::from_slice(body).context("request body is not valid JSON")?;
    Ok(Some(value))
}
