//! Request routing and the single error boundary.
//!
//! [`Handler::handle`] never fails: every outcome, including a panic inside
//! the engine, becomes a [`ResponseEnvelope`].
//!
//! ## Dispatch order
//!
//! 1. `OPTIONS` on any path → CORS preflight
//! 2. `GET /` → health check
//! 3. everything else runs inside the guarded region: normalise the event,
//!    then route by `(path, method)` according to the [`RouteSet`]
//!
//! Direct invocations carry no method or path and are routed as `POST` to
//! the empty path, i.e. the standard conversion.

use crate::config::RouteSet;
use crate::convert::Converter;
use crate::error::ConvertError;
use crate::pipeline::event::{normalize_event, RequestLine};
use crate::pipeline::input::ConversionArgs;
use crate::response::{binary_response, error_response, json_response, ResponseEnvelope};
use serde_json::{json, Value};
use tracing::{error, info};

/// Top-level entry point for one invocation.
#[derive(Debug, Clone)]
pub struct Handler {
    converter: Converter,
}

impl Handler {
    /// Handler serving the routes configured on `converter`.
    pub fn new(converter: Converter) -> Self {
        Self { converter }
    }

    /// Handle one invocation event.
    pub async fn handle(&self, event: Value) -> ResponseEnvelope {
        let line = RequestLine::from_event(&event);

        if line.is("OPTIONS") {
            return json_response(200, &json!({"message": "OK"}));
        }

        if line.path == "/" && line.is("GET") {
            return json_response(
                200,
                &json!({
                    "status": "healthy",
                    "service": self.converter.config().service_name,
                }),
            );
        }

        let response = match self.dispatch(&line, &event).await {
            Ok(response) => response,
            Err(e) => {
                if e.is_conversion_failure() {
                    error!("{} {} failed: {}", line.effective_method(), line.path, e);
                }
                error_response(&e)
            }
        };

        info!(
            "{} {} → {}",
            line.effective_method(),
            line.path,
            response.status_code
        );
        response
    }

    async fn dispatch(
        &self,
        line: &RequestLine,
        event: &Value,
    ) -> Result<ResponseEnvelope, ConvertError> {
        let payload = normalize_event(event)?;
        let args = ConversionArgs::from_payload(&payload);
        let method = line.effective_method();

        match self.converter.config().routes {
            RouteSet::Basic => self.convert(args).await,
            RouteSet::Full => match (line.path.as_str(), method) {
                ("/full", "POST") => self.export(args).await,
                ("" | "/", "POST") => self.convert(args).await,
                (path, method) => Err(ConvertError::UnknownEndpoint {
                    method: method.to_string(),
                    path: path.to_string(),
                }),
            },
        }
    }

    async fn convert(&self, args: ConversionArgs) -> Result<ResponseEnvelope, ConvertError> {
        let converter = self.converter.clone();
        let output =
            tokio::task::spawn_blocking(move || converter.convert_document(&args)).await??;
        Ok(json_response(200, &serde_json::to_value(&output)?))
    }

    async fn export(&self, args: ConversionArgs) -> Result<ResponseEnvelope, ConvertError> {
        let converter = self.converter.clone();
        let output =
            tokio::task::spawn_blocking(move || converter.export_document(&args)).await??;
        info!(
            "Exported {} ({} images, {} bytes)",
            output.filename,
            output.image_count,
            output.archive.len()
        );
        Ok(binary_response(200, &output.archive, &output.filename))
    }
}
