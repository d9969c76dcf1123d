use tower_http::cors::CorsLayer;

/// CORS policy allowing every origin, method and header.
///
/// Not suitable for production as-is: restrict origins before exposing the
/// service publicly.
pub fn permissive_cors() -> CorsLayer {
    CorsLayer::permissive()
}
