//! Database ID type definitions.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseId = i64;

/// The ID of a transaction, i.e. a payment or a request.
pub type TransactionId = DatabaseId;

/// The ID of a like on a transaction.
pub type LikeId = DatabaseId;

/// The ID of a comment on a transaction.
pub type CommentId = DatabaseId;
