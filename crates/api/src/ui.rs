//! Pages and the shared client script

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

use crate::demos::Demo;

const LAYOUT_HTML: &str = include_str!("../ui/layout.html");
const HOME_HTML: &str = include_str!("../ui/home.html");
const APP_JS: &str = include_str!("../ui/app.js");

/// Fill the layout: title, sidebar with the active dashboard marked, body
pub fn render_page(title: &str, active: Option<Demo>, body: &str) -> Html<String> {
    let nav: String = Demo::ALL
        .iter()
        .map(|demo| {
            let class = if Some(*demo) == active { " class=\"active\"" } else { "" };
            format!(
                "<li><a href=\"/demos/{}\"{}>{}</a></li>",
                demo.slug(),
                class,
                demo.title()
            )
        })
        .collect();

    let slug = active.map(|d| d.slug()).unwrap_or("");
    Html(
        LAYOUT_HTML
            .replace("{{title}}", title)
            .replace("{{nav}}", &nav)
            .replace("{{slug}}", slug)
            .replace("{{body}}", body),
    )
}

/// GET /
pub async fn serve_index() -> Html<String> {
    render_page("Responsible AI Dashboards", None, HOME_HTML)
}

/// GET /static/app.js
pub async fn serve_app_js() -> Response {
    (
        StatusCode::OK,
        [("content-type", "application/javascript")],
        APP_JS,
    )
        .into_response()
}
