//! Service worker endpoint.

use crate::state::AppState;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;

/// Worker body template. The placeholder is substituted rather than
/// using `format!` because the script is full of braces.
const WORKER_TEMPLATE: &str = r#"self.addEventListener('fetch', function(event) {
    var advertisedAddress = "__ADVERTISE_ADDRESS__";
    var pattern = /^https?:\/\//i;
    var encodeUrl = function(url) {
        return btoa(url).replace(/\+/g, '-').replace(/\//g, '_').replace(/=+$/, '');
    };
    if (pattern.test(event.request.url) && event.request.url.lastIndexOf("http://" + advertisedAddress) != 0) {
        var newUrl = "http://" + advertisedAddress + "/c/" + encodeUrl(event.request.url);
        event.respondWith(fetch(newUrl));
    } else {
        console.log("Skipping interception for URL: ", event.request.url);
    }
});
"#;

/// GET /service-worker.js - the fetch-interception worker registered by
/// the script injected into rewritten pages.
pub async fn service_worker(State(state): State<AppState>) -> impl IntoResponse {
    let script = WORKER_TEMPLATE.replace(
        "__ADVERTISE_ADDRESS__",
        &state.config.server.advertise_address,
    );
    ([(CONTENT_TYPE, "text/javascript")], script)
}
