#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteStatus {
    Creating,
    Active,
    Suspended,
    Deleted,
}

impl SiteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteStatus::Creating => "creating",
            SiteStatus::Active => "active",
            SiteStatus::Suspended => "suspended",
            SiteStatus::Deleted => "deleted",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "creating" => SiteStatus::Creating,
            "active" => SiteStatus::Active,
            "suspended" => SiteStatus::Suspended,
            "deleted" => SiteStatus::Deleted,
            _ => SiteStatus::Creating,
        }
    }
}

/// Product line a storefront was provisioned for.
pub const DEFAULT_PRODUCT_TYPE: &str = "woocommerce";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            SiteStatus::Creating,
            SiteStatus::Active,
            SiteStatus::Suspended,
            SiteStatus::Deleted,
        ] {
            assert_eq!(SiteStatus::from_str(status.as_str()), status);
        }
    }

    #[test]
    fn unknown_status_falls_back_to_creating() {
        assert_eq!(SiteStatus::from_str("bogus"), SiteStatus::Creating);
    }
}
