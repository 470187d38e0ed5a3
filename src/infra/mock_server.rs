//! Local stand-in for the Google REST endpoints used by adapter tests.

use std::net::SocketAddr;

use axum::Router;

/// Serves `router` on an ephemeral loopback port and returns its base URL.
pub fn spawn(router: Router) -> String {
    let addr = SocketAddr::from(([127, 0, 0, 1], 0));
    let server = axum::Server::bind(&addr).serve(router.into_make_service());
    let local = server.local_addr();
    tokio::spawn(server);
    format!("http://{}", local)
}
