use uuid::Uuid;

/// Stored value of the administrative recipient.
pub const ADMIN_RECIPIENT: &str = "admin";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Info => "info",
            NotificationKind::Success => "success",
            NotificationKind::Warning => "warning",
            NotificationKind::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "success" => NotificationKind::Success,
            "warning" => NotificationKind::Warning,
            "error" => NotificationKind::Error,
            _ => NotificationKind::Info,
        }
    }
}

/// Who a notification is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recipient {
    User(Uuid),
    Admins,
}

impl Recipient {
    pub fn to_db_value(&self) -> String {
        match self {
            Recipient::User(id) => id.to_string(),
            Recipient::Admins => ADMIN_RECIPIENT.to_string(),
        }
    }

    pub fn from_db_value(s: &str) -> Self {
        match Uuid::parse_str(s) {
            Ok(id) => Recipient::User(id),
            Err(_) => Recipient::Admins,
        }
    }
}
