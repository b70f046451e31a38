//! HTTP surface: `GET`/`POST` on `/` and `/makefulltextfeed`.
//!
//! Every response is `200 OK` with an XML body. Request errors are reported
//! in-band as an `<error>` document carrying a fixed public message; the
//! underlying diagnostics only go to the log.

use crate::error::{AppError, DEPENDENCY_ERROR_MESSAGE, Result};
use crate::fetcher::HttpClient;
use crate::outputs::rss::{render_error, render_feed};
use crate::pipeline::Enricher;
use crate::request::{FeedRequest, merge_params};
use axum::Router;
use axum::body::Bytes;
use axum::extract::{RawQuery, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument, warn};

pub const XML_CONTENT_TYPE: &str = "application/xml; charset=UTF-8";

pub fn router<C: HttpClient + 'static>(enricher: Arc<Enricher<C>>) -> Router {
    Router::new()
        .route("/", get(handle_get::<C>).post(handle_post::<C>))
        .route("/makefulltextfeed", get(handle_get::<C>).post(handle_post::<C>))
        .layer(TraceLayer::new_for_http())
        .with_state(enricher)
}

/// Bind `listen` and serve until the process is stopped.
pub async fn serve<C: HttpClient + 'static>(enricher: Enricher<C>, listen: &str) -> Result<()> {
    let listener = TcpListener::bind(listen)
        .await
        .map_err(|e| AppError::DependencyUnavailable(format!("cannot bind {listen}: {e}")))?;
    info!(%listen, "Listening");
    axum::serve(listener, router(Arc::new(enricher))).await?;
    Ok(())
}

async fn handle_get<C: HttpClient + 'static>(
    State(enricher): State<Arc<Enricher<C>>>,
    RawQuery(query): RawQuery,
) -> Response {
    let params = merge_params(query.as_deref(), &[]);
    xml_response(respond(&enricher, &params).await)
}

async fn handle_post<C: HttpClient + 'static>(
    State(enricher): State<Arc<Enricher<C>>>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Response {
    let params = merge_params(query.as_deref(), &body);
    xml_response(respond(&enricher, &params).await)
}

/// Resolve parameters, run the pipeline and render the document.
///
/// Always returns a complete XML document: the RSS feed, or an `<error>`
/// document when the request is unusable or rendering fails.
#[instrument(level = "info", skip_all)]
pub async fn respond<C: HttpClient>(
    enricher: &Enricher<C>,
    params: &HashMap<String, String>,
) -> String {
    let request = match FeedRequest::from_params(params, enricher.settings()) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Rejected request");
            return render_error(e.public_message());
        }
    };

    let feed = enricher.run(&request).await;
    match render_feed(&feed) {
        Ok(xml) => xml,
        Err(e) => {
            error!(error = %e, "Rendering failed");
            render_error(DEPENDENCY_ERROR_MESSAGE)
        }
    }
}

fn xml_response(body: String) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, XML_CONTENT_TYPE),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
            (header::REFERRER_POLICY, "no-referrer"),
            (header::X_FRAME_OPTIONS, "SAMEORIGIN"),
            (header::X_XSS_PROTECTION, "0"),
        ],
        body,
    )
        .into_response()
}
