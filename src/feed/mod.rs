//! The transaction feeds: personal, contacts and public.
//!
//! [partition] decides which transactions belong to a feed and [query]
//! filters, orders and pages them. The route handlers here validate the query
//! string and run the query against the database.

mod partition;
mod query;

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    db::lock_connection,
    extract::{PathParam, QueryParams},
    pagination::PaginationConfig,
    user::UserID,
};

pub use partition::{FeedPartition, is_visible_to};
pub use query::{
    AmountRange, FeedConfig, FeedFilter, FeedPage, FeedQuery, FeedRequest, get_feed_page,
    query_feed,
};

/// The state needed to serve feeds.
#[derive(Debug, Clone)]
pub struct FeedState {
    /// The database connection for reading transactions and contacts.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The default page and page size.
    pub pagination_config: PaginationConfig,
    /// How feeds are ordered.
    pub feed_config: FeedConfig,
}

impl FromRef<AppState> for FeedState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            pagination_config: state.pagination_config.clone(),
            feed_config: state.feed_config.clone(),
        }
    }
}

fn respond_with_feed(
    state: &FeedState,
    viewer: UserID,
    partition: FeedPartition,
    query: &FeedQuery,
) -> Result<Json<FeedPage>, Error> {
    let request = query.to_request(viewer, partition, state.pagination_config.default_page)?;
    let connection = lock_connection(&state.db_connection)?;

    get_feed_page(
        &request,
        state.pagination_config.page_size,
        &state.feed_config,
        &connection,
    )
    .map(Json)
}

/// A route handler for the transactions the viewer took part in.
pub async fn get_personal_feed(
    State(state): State<FeedState>,
    Extension(user_id): Extension<UserID>,
    QueryParams(query): QueryParams<FeedQuery>,
) -> Result<Json<FeedPage>, Error> {
    respond_with_feed(&state, user_id, FeedPartition::Personal, &query)
}

/// A route handler for the transactions involving the viewer's contacts.
pub async fn get_contacts_feed(
    State(state): State<FeedState>,
    Extension(user_id): Extension<UserID>,
    QueryParams(query): QueryParams<FeedQuery>,
) -> Result<Json<FeedPage>, Error> {
    respond_with_feed(&state, user_id, FeedPartition::Contacts, &query)
}

/// A route handler for the public transactions.
pub async fn get_public_feed(
    State(state): State<FeedState>,
    Extension(user_id): Extension<UserID>,
    QueryParams(query): QueryParams<FeedQuery>,
) -> Result<Json<FeedPage>, Error> {
    respond_with_feed(&state, user_id, FeedPartition::Public, &query)
}

/// A route handler for any feed, selected by the partition tag in the path.
///
/// Unknown tags are rejected with [Error::UnknownPartition].
pub async fn get_feed(
    State(state): State<FeedState>,
    Extension(user_id): Extension<UserID>,
    PathParam(partition): PathParam<String>,
    QueryParams(query): QueryParams<FeedQuery>,
) -> Result<Json<FeedPage>, Error> {
    let partition = partition.parse()?;

    respond_with_feed(&state, user_id, partition, &query)
}
