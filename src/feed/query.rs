//! Filtering, ordering and paging of a feed.
//!
//! [query_feed] is a pure function over a snapshot of transactions, so the
//! same snapshot and request always produce the same page.

use std::{cmp::Reverse, collections::HashSet};

use rusqlite::{Connection, ToSql};
use serde::{Deserialize, Serialize};
use time::UtcOffset;

use crate::{
    Error,
    amount::parse_cents,
    contact::get_contact_ids,
    day_bounds::{DateRangeFilter, parse_instant},
    feed::partition::{FeedPartition, is_contact_relevant},
    pagination::{PageData, paginate},
    transaction::{PrivacyLevel, Transaction, attach_likes_and_comments, get_transactions_where},
    user::UserID,
};

/// Settings that change how feeds are ordered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    /// Rank public transactions involving the viewer or their contacts ahead
    /// of the rest of the public feed.
    pub public_contacts_first: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            public_contacts_first: true,
        }
    }
}

/// An inclusive range of amounts in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountRange {
    min: i64,
    max: i64,
}

impl AmountRange {
    /// Create the range `[min, max]`.
    ///
    /// # Errors
    /// Returns [Error::InvalidRangeParameters] if `min` is greater than `max`.
    pub fn new(min: i64, max: i64) -> Result<Self, Error> {
        if min > max {
            return Err(Error::InvalidRangeParameters(format!(
                "amount minimum {min} is greater than the maximum {max}"
            )));
        }

        Ok(Self { min, max })
    }

    /// The inclusive lower bound in cents.
    pub fn min(&self) -> i64 {
        self.min
    }

    /// The inclusive upper bound in cents.
    pub fn max(&self) -> i64 {
        self.max
    }

    /// Whether `amount` is within the range.
    pub fn contains(&self, amount: i64) -> bool {
        self.min <= amount && amount <= self.max
    }
}

/// The optional filters of a feed query. All present filters must match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedFilter {
    /// Only include transactions created within this range.
    pub date_range: Option<DateRangeFilter>,
    /// Only include transactions with an amount within this range.
    pub amount_range: Option<AmountRange>,
}

impl FeedFilter {
    /// Whether `transaction` passes every present filter.
    pub fn matches(&self, transaction: &Transaction) -> bool {
        self.date_range
            .is_none_or(|range| range.contains(transaction.created_at))
            && self
                .amount_range
                .is_none_or(|range| range.contains(transaction.amount))
    }
}

/// A validated request for one page of a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRequest {
    /// The user the feed is for.
    pub viewer: UserID,
    /// Which feed to show.
    pub partition: FeedPartition,
    /// The filters to apply.
    pub filter: FeedFilter,
    /// The page number, starting at 1.
    pub page: u64,
}

/// The query string parameters accepted by the feed routes.
///
/// Values are kept as text so that malformed input is reported with the
/// feed's own error kinds. Empty values count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedQuery {
    /// Start of the date range, an ISO-8601 instant or date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range_start: Option<String>,
    /// Inclusive end of the date range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range_end: Option<String>,
    /// Inclusive minimum amount in cents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_min: Option<String>,
    /// Inclusive maximum amount in cents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_max: Option<String>,
    /// The page number, starting at 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|text| !text.is_empty())
}

impl FeedQuery {
    /// Validate the parameters into a [FeedFilter].
    ///
    /// # Errors
    /// Returns a:
    /// - [Error::InvalidRangeParameters] if only one bound of a range is given
    ///   or a date is malformed,
    /// - or [Error::InvalidAmount] if an amount bound is not a whole number of cents.
    pub fn to_filter(&self) -> Result<FeedFilter, Error> {
        let date_range = match (present(&self.date_range_start), present(&self.date_range_end)) {
            (Some(start), Some(end)) => {
                Some(DateRangeFilter::new(parse_instant(start)?, parse_instant(end)?))
            }
            (None, None) => None,
            _ => {
                return Err(Error::InvalidRangeParameters(
                    "dateRangeStart and dateRangeEnd must be given together".to_owned(),
                ));
            }
        };

        let amount_range = match (present(&self.amount_min), present(&self.amount_max)) {
            (Some(min), Some(max)) => Some(AmountRange::new(parse_cents(min)?, parse_cents(max)?)?),
            (None, None) => None,
            _ => {
                return Err(Error::InvalidRangeParameters(
                    "amountMin and amountMax must be given together".to_owned(),
                ));
            }
        };

        Ok(FeedFilter {
            date_range,
            amount_range,
        })
    }

    /// The requested page number, or `default_page` when none is given.
    ///
    /// # Errors
    /// Returns [Error::InvalidPage] if the page is not a positive integer.
    pub fn page(&self, default_page: u64) -> Result<u64, Error> {
        match present(&self.page) {
            None => Ok(default_page),
            Some(text) => match text.parse::<u64>() {
                Ok(page) if page >= 1 => Ok(page),
                _ => Err(Error::InvalidPage),
            },
        }
    }

    /// Validate the parameters into a [FeedRequest] for `viewer`.
    ///
    /// # Errors
    /// See [FeedQuery::to_filter] and [FeedQuery::page].
    pub fn to_request(
        &self,
        viewer: UserID,
        partition: FeedPartition,
        default_page: u64,
    ) -> Result<FeedRequest, Error> {
        Ok(FeedRequest {
            viewer,
            partition,
            filter: self.to_filter()?,
            page: self.page(default_page)?,
        })
    }
}

/// One page of a feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    /// The transactions on the page in feed order.
    pub results: Vec<Transaction>,
    /// Where the page sits in the full feed.
    pub page_data: PageData,
}

/// Select, order and page the transactions in `snapshot` for `request`.
///
/// Transactions are ordered newest first with ties broken by ascending ID.
/// With [FeedConfig::public_contacts_first] the public feed shows the
/// transactions involving the viewer or their contacts before the rest.
pub fn query_feed(
    request: &FeedRequest,
    snapshot: Vec<Transaction>,
    contacts: &HashSet<UserID>,
    page_size: u64,
    config: &FeedConfig,
) -> FeedPage {
    let mut matches: Vec<Transaction> = snapshot
        .into_iter()
        .filter(|transaction| {
            request
                .partition
                .includes(transaction, request.viewer, contacts)
        })
        .filter(|transaction| request.filter.matches(transaction))
        .collect();

    let rank_contacts = request.partition == FeedPartition::Public && config.public_contacts_first;
    matches.sort_by_key(|transaction| {
        let contact_rank =
            if rank_contacts && is_contact_relevant(transaction, request.viewer, contacts) {
                0
            } else {
                u8::from(rank_contacts)
            };

        (contact_rank, Reverse(transaction.created_at), transaction.id)
    });

    let page = paginate(matches, request.page, page_size);

    FeedPage {
        results: page.items,
        page_data: page.page_data,
    }
}

const PERSONAL_CONDITION: &str = "(sender_id = :viewer OR receiver_id = :viewer)";

const CONTACTS_CONDITION: &str = "(sender_id IN (SELECT contact_user_id FROM contact WHERE user_id = :viewer) \
    OR receiver_id IN (SELECT contact_user_id FROM contact WHERE user_id = :viewer))";

/// Load the transactions that may belong to the feed for `request`.
///
/// The partition, date and amount filters narrow the rows in SQL. The result
/// is a superset of the feed, [query_feed] applies the exact rules.
///
/// # Errors
/// Returns [Error::StoreUnavailable] if the store cannot be read.
pub(crate) fn get_feed_snapshot(
    request: &FeedRequest,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let public = PrivacyLevel::Public;
    // SQLite's date() reads the stored offset, so both sides are UTC calendar dates.
    let date_bounds = request.filter.date_range.map(|range| {
        (
            range.start().to_offset(UtcOffset::UTC).date(),
            range.end().to_offset(UtcOffset::UTC).date(),
        )
    });
    let amount_bounds = request
        .filter
        .amount_range
        .map(|range| (range.min(), range.max()));

    let mut conditions = Vec::new();
    let mut params: Vec<(&str, &dyn ToSql)> = Vec::new();

    match request.partition {
        FeedPartition::Personal => {
            conditions.push(PERSONAL_CONDITION);
            params.push((":viewer", &request.viewer));
        }
        FeedPartition::Contacts => {
            conditions.push(CONTACTS_CONDITION);
            params.push((":viewer", &request.viewer));
        }
        FeedPartition::Public => {
            conditions.push("privacy_level = :privacy_level");
            params.push((":privacy_level", &public));
        }
    }

    if let Some((start_date, end_date)) = &date_bounds {
        conditions.push("date(created_at) BETWEEN :start_date AND :end_date");
        params.push((":start_date", start_date));
        params.push((":end_date", end_date));
    }

    if let Some((min, max)) = &amount_bounds {
        conditions.push("amount BETWEEN :amount_min AND :amount_max");
        params.push((":amount_min", min));
        params.push((":amount_max", max));
    }

    get_transactions_where(&conditions, &params, connection)
}

/// Load the candidate transactions and contacts for `request`, query the
/// feed, and attach likes and comments to the transactions on the resulting
/// page.
///
/// # Errors
/// Returns [Error::StoreUnavailable] if the store cannot be read.
pub fn get_feed_page(
    request: &FeedRequest,
    page_size: u64,
    config: &FeedConfig,
    connection: &Connection,
) -> Result<FeedPage, Error> {
    let snapshot = get_feed_snapshot(request, connection)?;
    let contacts = get_contact_ids(request.viewer, connection)?;

    let mut feed_page = query_feed(request, snapshot, &contacts, page_size, config);
    attach_likes_and_comments(&mut feed_page.results, connection)?;

    tracing::debug!(
        "Feed {} page {} for user {}: {} of {} pages",
        request.partition,
        request.page,
        request.viewer,
        feed_page.results.len(),
        feed_page.page_data.total_pages
    );

    Ok(feed_page)
}
