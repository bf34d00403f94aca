//! Notification kinds and who may receive them.

use serde::{Deserialize, Serialize};

use super::role::UserRole;

/// Kind of a stored notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "notification_type", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    /// Order placed by the recipient.
    Order,
    /// New order, admin feed.
    AdminOrder,
    /// Question activity.
    Qna,
    /// Answer to the recipient's question.
    QnaReply,
    /// New question, admin feed.
    AdminQna,
    /// Review activity.
    Review,
    /// Reply to the recipient's review.
    ReviewReply,
    /// New review, admin feed.
    AdminReview,
    /// Store notice.
    Notice,
    /// Marketing message.
    Marketing,
    /// Advertisement push.
    Advertisement,
}

/// The parts of an account that decide notification eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecipientProfile {
    /// Account role.
    pub role: UserRole,
    /// Whether the account is active.
    pub active: bool,
    /// Whether the account opted in to marketing.
    pub marketing_consent: bool,
}

/// Which accounts a bulk notification of a given type fans out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAudience {
    /// Active non-admins who opted in to marketing.
    ConsentingUsers,
    /// Every active account, admins included.
    AllActive,
    /// Active non-admins.
    ActiveUsers,
}

impl NotificationType {
    /// Whether an admin account may receive this type.
    #[must_use]
    pub const fn admin_receivable(self) -> bool {
        matches!(
            self,
            Self::Order
                | Self::Qna
                | Self::Review
                | Self::AdminOrder
                | Self::AdminQna
                | Self::AdminReview
        )
    }

    /// Whether the recipient must have opted in to marketing.
    #[must_use]
    pub const fn requires_marketing_consent(self) -> bool {
        matches!(self, Self::Marketing | Self::Advertisement)
    }

    /// Whether this type belongs to the admin broadcast feed.
    #[must_use]
    pub const fn is_admin_feed(self) -> bool {
        matches!(self, Self::AdminOrder | Self::AdminQna | Self::AdminReview)
    }

    /// Whether a single notification of this type may be stored for `recipient`.
    #[must_use]
    pub const fn is_deliverable_to(self, recipient: &RecipientProfile) -> bool {
        if recipient.role.is_admin() && !self.admin_receivable() {
            return false;
        }
        if self.requires_marketing_consent() && !recipient.marketing_consent {
            return false;
        }
        true
    }

    /// Audience for a bulk send of this type.
    #[must_use]
    pub const fn bulk_audience(self) -> BulkAudience {
        if self.requires_marketing_consent() {
            BulkAudience::ConsentingUsers
        } else if matches!(self, Self::Order | Self::Qna | Self::Review) {
            BulkAudience::AllActive
        } else {
            BulkAudience::ActiveUsers
        }
    }

    /// The `SCREAMING_SNAKE_CASE` wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Order => "ORDER",
            Self::AdminOrder => "ADMIN_ORDER",
            Self::Qna => "QNA",
            Self::QnaReply => "QNA_REPLY",
            Self::AdminQna => "ADMIN_QNA",
            Self::Review => "REVIEW",
            Self::ReviewReply => "REVIEW_REPLY",
            Self::AdminReview => "ADMIN_REVIEW",
            Self::Notice => "NOTICE",
            Self::Marketing => "MARKETING",
            Self::Advertisement => "ADVERTISEMENT",
        }
    }
}

impl BulkAudience {
    /// Whether `recipient` is part of this audience.
    #[must_use]
    pub const fn includes(self, recipient: &RecipientProfile) -> bool {
        if !recipient.active {
            return false;
        }
        match self {
            Self::ConsentingUsers => !recipient.role.is_admin() && recipient.marketing_consent,
            Self::AllActive => true,
            Self::ActiveUsers => !recipient.role.is_admin(),
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NotificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        [
            Self::Order,
            Self::AdminOrder,
            Self::Qna,
            Self::QnaReply,
            Self::AdminQna,
            Self::Review,
            Self::ReviewReply,
            Self::AdminReview,
            Self::Notice,
            Self::Marketing,
            Self::Advertisement,
        ]
        .into_iter()
        .find(|kind| kind.as_str().eq_ignore_ascii_case(wanted))
        .ok_or_else(|| format!("invalid notification type: {s}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ADMIN: RecipientProfile = RecipientProfile {
        role: UserRole::Admin,
        active: true,
        marketing_consent: true,
    };

    const SHOPPER: RecipientProfile = RecipientProfile {
        role: UserRole::User,
        active: true,
        marketing_consent: false,
    };

    const OPTED_IN: RecipientProfile = RecipientProfile {
        marketing_consent: true,
        ..SHOPPER
    };

    #[test]
    fn test_admin_only_gets_operational_types() {
        assert!(NotificationType::AdminOrder.is_deliverable_to(&ADMIN));
        assert!(NotificationType::Qna.is_deliverable_to(&ADMIN));
        assert!(!NotificationType::Notice.is_deliverable_to(&ADMIN));
        assert!(!NotificationType::Advertisement.is_deliverable_to(&ADMIN));
    }

    #[test]
    fn test_marketing_requires_consent() {
        assert!(!NotificationType::Marketing.is_deliverable_to(&SHOPPER));
        assert!(NotificationType::Marketing.is_deliverable_to(&OPTED_IN));
        assert!(NotificationType::Notice.is_deliverable_to(&SHOPPER));
    }

    #[test]
    fn test_bulk_audiences() {
        assert_eq!(
            NotificationType::Advertisement.bulk_audience(),
            BulkAudience::ConsentingUsers
        );
        assert_eq!(NotificationType::Review.bulk_audience(), BulkAudience::AllActive);
        assert_eq!(NotificationType::Notice.bulk_audience(), BulkAudience::ActiveUsers);

        assert!(BulkAudience::AllActive.includes(&ADMIN));
        assert!(!BulkAudience::ActiveUsers.includes(&ADMIN));
        assert!(!BulkAudience::ConsentingUsers.includes(&SHOPPER));
        assert!(BulkAudience::ConsentingUsers.includes(&OPTED_IN));
    }

    #[test]
    fn test_inactive_accounts_are_never_in_an_audience() {
        let dormant = RecipientProfile {
            active: false,
            ..OPTED_IN
        };
        assert!(!BulkAudience::AllActive.includes(&dormant));
        assert!(!BulkAudience::ConsentingUsers.includes(&dormant));
    }

    #[test]
    fn test_wire_names_round_trip() {
        assert_eq!(
            serde_json::to_string(&NotificationType::QnaReply).unwrap(),
            "\"QNA_REPLY\""
        );
        assert_eq!(
            "admin_review".parse::<NotificationType>().unwrap(),
            NotificationType::AdminReview
        );
    }
}
