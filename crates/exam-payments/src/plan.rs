//! Plan Catalog
//!
//! Static subscription tiers. Prices are held in kobo; the naira figure is
//! derived so the two can never disagree.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Subscription plan tiers
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanId {
    #[default]
    Free,
    Student,
    Premium,
}

impl PlanId {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Student => "student",
            Self::Premium => "premium",
        }
    }

    /// Parse a plan identifier; unknown names yield `None`
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "free" => Some(Self::Free),
            "student" => Some(Self::Student),
            "premium" => Some(Self::Premium),
            _ => None,
        }
    }

    /// Catalog entry for this tier
    pub fn plan(self) -> Plan {
        match self {
            Self::Free => Plan {
                id: self,
                name: "Free".into(),
                price: Decimal::ZERO,
                price_minor: 0,
                interval: BillingInterval::Forever,
                features: vec![
                    "Browse past questions by school and course".into(),
                    "Preview the first page of any paper".into(),
                    "Upload papers for review".into(),
                ],
                popular: false,
            },
            Self::Student => Plan::paid(
                self,
                "Student",
                2_000_000,
                vec![
                    "Unlimited past question downloads".into(),
                    "Full-resolution papers".into(),
                    "Bookmark courses".into(),
                    "Email support".into(),
                ],
                true,
            ),
            Self::Premium => Plan::paid(
                self,
                "Premium",
                5_000_000,
                vec![
                    "Everything in Student".into(),
                    "Worked solutions where available".into(),
                    "Early access to new uploads".into(),
                    "Priority support".into(),
                ],
                false,
            ),
        }
    }
}

impl std::fmt::Display for PlanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Billing interval. Paid plans are annual only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingInterval {
    Forever,
    Yearly,
}

/// A catalog entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub name: String,

    /// Price in naira
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,

    /// Price in kobo, as exchanged with the provider
    pub price_minor: i64,

    pub interval: BillingInterval,
    pub features: Vec<String>,
    pub popular: bool,
}

impl Plan {
    fn paid(id: PlanId, name: &str, price_minor: i64, features: Vec<String>, popular: bool) -> Self {
        Self {
            id,
            name: name.into(),
            price: to_major(price_minor),
            price_minor,
            interval: BillingInterval::Yearly,
            features,
            popular,
        }
    }
}

/// The full catalog, cheapest first
pub fn catalog() -> Vec<Plan> {
    [PlanId::Free, PlanId::Student, PlanId::Premium]
        .into_iter()
        .map(PlanId::plan)
        .collect()
}

/// Map a settled amount to the plan it buys.
///
/// Anything at or above the premium price is premium, any other positive
/// amount is student. Zero and negative amounts buy nothing.
pub fn plan_for_amount(amount_minor: i64) -> Option<PlanId> {
    if amount_minor >= PlanId::Premium.plan().price_minor {
        Some(PlanId::Premium)
    } else if amount_minor > 0 {
        Some(PlanId::Student)
    } else {
        None
    }
}

/// Kobo to naira
pub fn to_major(amount_minor: i64) -> Decimal {
    Decimal::new(amount_minor, 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_plan_pricing() {
        let student = PlanId::Student.plan();
        assert_eq!(student.price_minor, 2_000_000);
        assert_eq!(student.price, dec!(20000));
        assert_eq!(student.interval, BillingInterval::Yearly);
        assert!(student.popular);

        let free = PlanId::Free.plan();
        assert_eq!(free.price_minor, 0);
        assert_eq!(free.interval, BillingInterval::Forever);
    }

    #[test]
    fn test_premium_threshold() {
        let premium = PlanId::Premium.plan().price_minor;
        assert_eq!(plan_for_amount(premium), Some(PlanId::Premium));
        assert_eq!(plan_for_amount(premium + 1), Some(PlanId::Premium));
        assert_eq!(plan_for_amount(premium - 1), Some(PlanId::Student));
        assert_eq!(plan_for_amount(2_000_000), Some(PlanId::Student));
    }

    #[test]
    fn test_zero_amount_buys_nothing() {
        assert_eq!(plan_for_amount(0), None);
        assert_eq!(plan_for_amount(-100), None);
    }

    #[test]
    fn test_catalog_order() {
        let ids: Vec<_> = catalog().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![PlanId::Free, PlanId::Student, PlanId::Premium]);
    }

    #[test]
    fn test_unit_conversion() {
        assert_eq!(to_major(150), dec!(1.50));
    }

    #[test]
    fn test_plan_id_parsing() {
        assert_eq!(PlanId::parse("Premium"), Some(PlanId::Premium));
        assert_eq!(PlanId::parse("gold"), None);
        assert_eq!(serde_json::to_string(&PlanId::Student).unwrap(), "\"student\"");
    }
}
