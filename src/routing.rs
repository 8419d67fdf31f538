//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::{
    AppState, Error,
    auth::{auth_guard, get_log_out, post_log_in},
    contact::{create_contact_endpoint, get_contacts_endpoint},
    endpoints,
    feed::{get_contacts_feed, get_feed, get_personal_feed, get_public_feed},
    fixture::seed_test_data_endpoint,
    transaction::{
        create_comment_endpoint, create_like_endpoint, create_transaction_endpoint,
        get_transaction_endpoint, resolve_request_endpoint,
    },
};

/// Return a router with all the app's routes.
///
/// The route that resets the database to the test fixture is only added when
/// `enable_test_data_routes` is set.
pub fn build_router(state: AppState, enable_test_data_routes: bool) -> Router {
    let mut unprotected_routes = Router::new()
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out));

    if enable_test_data_routes {
        tracing::warn!("Test data routes are enabled, any client can reset the database");
        unprotected_routes =
            unprotected_routes.route(endpoints::SEED_TEST_DATA, post(seed_test_data_endpoint));
    }

    let protected_routes = Router::new()
        .route(
            endpoints::TRANSACTIONS_API,
            get(get_personal_feed).post(create_transaction_endpoint),
        )
        .route(endpoints::CONTACTS_FEED_API, get(get_contacts_feed))
        .route(endpoints::PUBLIC_FEED_API, get(get_public_feed))
        .route(endpoints::FEED_API, get(get_feed))
        .route(
            endpoints::TRANSACTION_API,
            get(get_transaction_endpoint).patch(resolve_request_endpoint),
        )
        .route(endpoints::TRANSACTION_LIKES_API, post(create_like_endpoint))
        .route(
            endpoints::TRANSACTION_COMMENTS_API,
            post(create_comment_endpoint),
        )
        .route(
            endpoints::CONTACTS_API,
            get(get_contacts_endpoint).post(create_contact_endpoint),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}

async fn get_404_not_found() -> Response {
    Error::NotFound.into_response()
}
