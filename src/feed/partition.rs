//! Decides which transactions belong to each feed.

use std::{collections::HashSet, fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    Error,
    transaction::{PrivacyLevel, Transaction},
    user::UserID,
};

/// One of the three views over the transaction history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedPartition {
    /// Transactions the viewer took part in.
    Personal,
    /// Transactions involving the viewer's contacts.
    Contacts,
    /// Every public transaction.
    Public,
}

impl FeedPartition {
    /// The tag used for the partition in URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedPartition::Personal => "personal",
            FeedPartition::Contacts => "contacts",
            FeedPartition::Public => "public",
        }
    }

    /// Whether `transaction` belongs to this partition for `viewer`.
    ///
    /// `contacts` must be the set of users in the viewer's address book.
    pub fn includes(
        &self,
        transaction: &Transaction,
        viewer: UserID,
        contacts: &HashSet<UserID>,
    ) -> bool {
        match self {
            FeedPartition::Personal => transaction.has_participant(viewer),
            FeedPartition::Contacts => {
                involves_any(transaction, contacts) && is_visible_to(transaction, viewer, contacts)
            }
            FeedPartition::Public => transaction.privacy_level == PrivacyLevel::Public,
        }
    }
}

impl Display for FeedPartition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedPartition {
    type Err = Error;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "personal" => Ok(FeedPartition::Personal),
            "contacts" => Ok(FeedPartition::Contacts),
            "public" => Ok(FeedPartition::Public),
            other => Err(Error::UnknownPartition(other.to_owned())),
        }
    }
}

/// Whether the privacy level of `transaction` lets `viewer` see it.
///
/// Participants always see their own transactions. Contacts-only
/// transactions are visible when the sender or receiver is in `contacts`.
pub fn is_visible_to(transaction: &Transaction, viewer: UserID, contacts: &HashSet<UserID>) -> bool {
    if transaction.has_participant(viewer) {
        return true;
    }

    match transaction.privacy_level {
        PrivacyLevel::Public => true,
        PrivacyLevel::Contacts => involves_any(transaction, contacts),
        PrivacyLevel::Private => false,
    }
}

/// Whether the viewer or one of their contacts took part in `transaction`.
///
/// Used to rank the public feed.
pub fn is_contact_relevant(
    transaction: &Transaction,
    viewer: UserID,
    contacts: &HashSet<UserID>,
) -> bool {
    transaction.has_participant(viewer) || involves_any(transaction, contacts)
}

fn involves_any(transaction: &Transaction, users: &HashSet<UserID>) -> bool {
    users.contains(&transaction.sender_id) || users.contains(&transaction.receiver_id)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use time::macros::datetime;

    use crate::{
        Error,
        transaction::{PrivacyLevel, Transaction, TransactionStatus},
        user::UserID,
    };

    use super::{FeedPartition, is_contact_relevant, is_visible_to};

    const VIEWER: UserID = UserID::new(1);
    const CONTACT: UserID = UserID::new(2);
    const STRANGER: UserID = UserID::new(3);
    const OTHER_STRANGER: UserID = UserID::new(4);

    fn transaction(sender: UserID, receiver: UserID, privacy_level: PrivacyLevel) -> Transaction {
        Transaction {
            id: 1,
            sender_id: sender,
            receiver_id: receiver,
            amount: 100,
            description: String::new(),
            privacy_level,
            status: TransactionStatus::Complete,
            request_status: None,
            request_resolved_at: None,
            created_at: datetime!(2020-01-01 00:00 UTC),
            modified_at: datetime!(2020-01-01 00:00 UTC),
            likes: Vec::new(),
            comments: Vec::new(),
        }
    }

    fn contacts() -> HashSet<UserID> {
        HashSet::from([CONTACT])
    }

    #[test]
    fn parses_partition_tags() {
        assert_eq!("personal".parse::<FeedPartition>(), Ok(FeedPartition::Personal));
        assert_eq!("contacts".parse::<FeedPartition>(), Ok(FeedPartition::Contacts));
        assert_eq!("public".parse::<FeedPartition>(), Ok(FeedPartition::Public));
        assert_eq!(
            "friends".parse::<FeedPartition>(),
            Err(Error::UnknownPartition("friends".to_owned()))
        );
    }

    #[test]
    fn personal_includes_only_participants() {
        let contacts = contacts();

        for privacy in [PrivacyLevel::Public, PrivacyLevel::Contacts, PrivacyLevel::Private] {
            assert!(FeedPartition::Personal.includes(
                &transaction(VIEWER, STRANGER, privacy),
                VIEWER,
                &contacts
            ));
            assert!(FeedPartition::Personal.includes(
                &transaction(STRANGER, VIEWER, privacy),
                VIEWER,
                &contacts
            ));
        }
        assert!(!FeedPartition::Personal.includes(
            &transaction(CONTACT, STRANGER, PrivacyLevel::Public),
            VIEWER,
            &contacts
        ));
    }

    #[test]
    fn contacts_requires_a_contact_participant() {
        let contacts = contacts();

        assert!(FeedPartition::Contacts.includes(
            &transaction(CONTACT, STRANGER, PrivacyLevel::Public),
            VIEWER,
            &contacts
        ));
        assert!(FeedPartition::Contacts.includes(
            &transaction(STRANGER, CONTACT, PrivacyLevel::Contacts),
            VIEWER,
            &contacts
        ));
        assert!(!FeedPartition::Contacts.includes(
            &transaction(STRANGER, OTHER_STRANGER, PrivacyLevel::Public),
            VIEWER,
            &contacts
        ));
    }

    #[test]
    fn contacts_hides_private_transactions_of_others() {
        let contacts = contacts();

        assert!(!FeedPartition::Contacts.includes(
            &transaction(CONTACT, STRANGER, PrivacyLevel::Private),
            VIEWER,
            &contacts
        ));
        assert!(FeedPartition::Contacts.includes(
            &transaction(CONTACT, VIEWER, PrivacyLevel::Private),
            VIEWER,
            &contacts
        ));
    }

    #[test]
    fn public_includes_only_public_transactions() {
        let contacts = contacts();

        assert!(FeedPartition::Public.includes(
            &transaction(STRANGER, OTHER_STRANGER, PrivacyLevel::Public),
            VIEWER,
            &contacts
        ));
        assert!(!FeedPartition::Public.includes(
            &transaction(VIEWER, CONTACT, PrivacyLevel::Contacts),
            VIEWER,
            &contacts
        ));
        assert!(!FeedPartition::Public.includes(
            &transaction(VIEWER, CONTACT, PrivacyLevel::Private),
            VIEWER,
            &contacts
        ));
    }

    #[test]
    fn visibility_follows_privacy_level() {
        let contacts = contacts();

        assert!(is_visible_to(
            &transaction(STRANGER, OTHER_STRANGER, PrivacyLevel::Public),
            VIEWER,
            &contacts
        ));
        assert!(is_visible_to(
            &transaction(CONTACT, STRANGER, PrivacyLevel::Contacts),
            VIEWER,
            &contacts
        ));
        assert!(!is_visible_to(
            &transaction(STRANGER, OTHER_STRANGER, PrivacyLevel::Contacts),
            VIEWER,
            &contacts
        ));
        assert!(!is_visible_to(
            &transaction(CONTACT, STRANGER, PrivacyLevel::Private),
            VIEWER,
            &contacts
        ));
        assert!(is_visible_to(
            &transaction(STRANGER, VIEWER, PrivacyLevel::Private),
            VIEWER,
            &contacts
        ));
    }

    #[test]
    fn contact_relevance_includes_viewer_and_contacts() {
        let contacts = contacts();

        assert!(is_contact_relevant(
            &transaction(VIEWER, STRANGER, PrivacyLevel::Public),
            VIEWER,
            &contacts
        ));
        assert!(is_contact_relevant(
            &transaction(STRANGER, CONTACT, PrivacyLevel::Public),
            VIEWER,
            &contacts
        ));
        assert!(!is_contact_relevant(
            &transaction(STRANGER, OTHER_STRANGER, PrivacyLevel::Public),
            VIEWER,
            &contacts
        ));
    }
}
