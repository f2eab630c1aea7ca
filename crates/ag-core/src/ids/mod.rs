//! ID type wrappers for type safety.

mod id_macro;
mod idempotency;

use id_macro::impl_id;

pub use idempotency::IdempotencyKey;

impl_id!(
    EventId,
    ProposalId,
    AssumptionId,
    CriterionId,
    OptionId,
    CommentId,
    UserId,
    MembershipId,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_round_trips_through_json_as_plain_string() {
        let id = ProposalId::new("p-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"p-1\"");

        let back: ProposalId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_id_display_and_conversions() {
        let id: CriterionId = "c-9".into();
        assert_eq!(id.to_string(), "c-9");
        assert_eq!(id.as_str(), "c-9");
        let raw: String = id.into();
        assert_eq!(raw, "c-9");
    }
}
