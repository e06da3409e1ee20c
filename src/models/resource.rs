use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

use crate::models::lifecycle::VerificationStatus;
use crate::utils::record_id::{as_string, option_as_string};

/// A kind of relief supply with its current stock. Costs are minor currency units.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ResourceType {
    #[serde(serialize_with = "as_string")]
    pub id: RecordId,
    pub name: String, // ! unique
    pub category: String,
    pub unit: String,
    pub unit_cost: i64,
    pub quantity_available: i64,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Serialize, Debug, Clone)]
pub struct CreateResourceType {
    pub name: String,
    pub category: String,
    pub unit: String,
    pub unit_cost: i64,
    pub quantity_available: i64,
    pub created_at: String,
}

/// Physical goods offered by the public, counted into stock only once verified.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Contribution {
    #[serde(serialize_with = "as_string")]
    pub id: RecordId,
    pub contributor_name: String,
    pub contributor_email: String,
    #[serde(serialize_with = "option_as_string", default)]
    pub contributor: Option<RecordId>,
    #[serde(serialize_with = "as_string")]
    pub resource: RecordId,
    pub quantity: i64,
    pub notes: Option<String>,
    pub status: VerificationStatus,
    #[serde(serialize_with = "option_as_string", default)]
    pub reviewed_by: Option<RecordId>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Serialize, Debug, Clone)]
pub struct CreateContribution {
    pub contributor_name: String,
    pub contributor_email: String,
    pub contributor: Option<RecordId>,
    pub resource: RecordId,
    pub quantity: i64,
    pub notes: Option<String>,
    pub status: VerificationStatus,
    pub created_at: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Allocation {
    #[serde(serialize_with = "as_string")]
    pub id: RecordId,
    #[serde(serialize_with = "as_string")]
    pub shelter: RecordId,
    #[serde(serialize_with = "as_string")]
    pub resource: RecordId,
    pub quantity: i64,
    pub cost: i64,
    pub notes: Option<String>,
    #[serde(serialize_with = "as_string")]
    pub allocated_by: RecordId,
    pub created_at: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct CreateAllocation {
    pub shelter: RecordId,
    pub resource: RecordId,
    pub quantity: i64,
    pub cost: i64,
    pub notes: Option<String>,
    pub allocated_by: RecordId,
    pub created_at: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ShelterSpend {
    pub shelter: String,
    pub cost: i64,
    pub allocations: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct AllocationSummary {
    pub total_raised: i64,
    pub total_allocated: i64,
    pub balance: i64,
    pub per_shelter: Vec<ShelterSpend>,
}

impl AllocationSummary {
    pub fn build(total_raised: i64, allocations: &[Allocation]) -> Self {
        let mut per_shelter: Vec<ShelterSpend> = Vec::new();
        for allocation in allocations {
            let shelter = allocation.shelter.to_string();
            match per_shelter.iter_mut().find(|s| s.shelter == shelter) {
                Some(entry) => {
                    entry.cost += allocation.cost;
                    entry.allocations += 1;
                }
                None => per_shelter.push(ShelterSpend {
                    shelter,
                    cost: allocation.cost,
                    allocations: 1,
                }),
            }
        }
        per_shelter.sort_by(|a, b| b.cost.cmp(&a.cost).then_with(|| a.shelter.cmp(&b.shelter)));
        let total_allocated = allocations.iter().map(|a| a.cost).sum();
        Self {
            total_raised,
            total_allocated,
            balance: total_raised - total_allocated,
            per_shelter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocation(shelter: &str, cost: i64) -> Allocation {
        Allocation {
            id: crate::utils::ids::new_record_id("allocations"),
            shelter: RecordId::from_table_key("shelters", shelter),
            resource: RecordId::from_table_key("resources", "water"),
            quantity: 1,
            cost,
            notes: None,
            allocated_by: RecordId::from_table_key("users", "admin"),
            created_at: String::new(),
        }
    }

    #[test]
    fn summary_groups_cost_by_shelter() {
        let summary = AllocationSummary::build(
            10_000,
            &[allocation("a", 1_500), allocation("b", 4_000), allocation("a", 500)],
        );
        assert_eq!(summary.total_allocated, 6_000);
        assert_eq!(summary.balance, 4_000);
        assert_eq!(summary.per_shelter.len(), 2);
        assert_eq!(summary.per_shelter[0].cost, 4_000);
        assert_eq!(summary.per_shelter[1].allocations, 2);
    }
}
