use serde::{Deserialize, Serialize};

/// Message listing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MessageContainer {
    Inbox,
    Outbox,
    #[default]
    Unread,
}

impl MessageContainer {
    /// Any value other than `Inbox` or `Outbox`, including none, means `Unread`.
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("Inbox") => Self::Inbox,
            Some("Outbox") => Self::Outbox,
            _ => Self::Unread,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inbox => "Inbox",
            Self::Outbox => "Outbox",
            Self::Unread => "Unread",
        }
    }
}

impl std::fmt::Display for MessageContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort key for the member directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MemberOrder {
    #[default]
    LastActive,
    Created,
}

impl MemberOrder {
    /// `created` selects creation order; everything else falls back to last activity.
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("created") => Self::Created,
            _ => Self::LastActive,
        }
    }
}

/// Role tag attached to a user. A user may hold several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Member,
    Moderator,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "Member",
            Self::Moderator => "Moderator",
            Self::Admin => "Admin",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "Member" => Some(Self::Member),
            "Moderator" => Some(Self::Moderator),
            "Admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Whether this role may work the photo moderation queue.
    pub fn can_moderate(&self) -> bool {
        matches!(self, Self::Moderator | Self::Admin)
    }
}
