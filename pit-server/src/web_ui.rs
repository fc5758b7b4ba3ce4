//! Embedded dashboard page

use axum::response::Html;

/// Serve the embedded dashboard
pub async fn serve_ui() -> Html<&'static str> {
    Html(include_str!("ui.html"))
}
