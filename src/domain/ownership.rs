//! Ownership resolution over heterogeneous records.
//!
//! Older rows spell the owning profile in many ways (`profileId`, `owner_id`,
//! `owner.profileId`, `rescuedBy`, ...). New writes get the owner stamped into the
//! collection's canonical field by [`normalize_owner`]; reads still scan every spelling.

use crate::domain::collection::CollectionSchema;
use serde_json::{Map, Value as JsonValue};
use std::collections::HashSet;

const FLAT_CANDIDATES: [&str; 6] = [
    "profileId",
    "profileid",
    "profile_id",
    "ownerId",
    "ownerid",
    "owner_id",
];

const RESCUE_CANDIDATES: [&str; 3] = ["rescued_by", "rescuedBy", "rescueOwner"];

/// String form of an id value. Numbers are stringified, null and structures yield `None`.
pub fn id_string(v: &JsonValue) -> Option<String> {
    match v {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Every owner spelling present on `item`, in precedence order.
pub fn owner_candidates(item: &JsonValue) -> Vec<String> {
    let Some(obj) = item.as_object() else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for key in FLAT_CANDIDATES {
        if let Some(s) = obj.get(key).and_then(id_string) {
            out.push(s);
        }
    }
    if let Some(owner) = obj.get("owner").and_then(JsonValue::as_object) {
        let nested = owner
            .get("id")
            .filter(|v| !v.is_null())
            .or_else(|| owner.get("profileId"));
        if let Some(s) = nested.and_then(id_string) {
            out.push(s);
        }
    }
    for key in RESCUE_CANDIDATES {
        if let Some(s) = obj.get(key).and_then(id_string) {
            out.push(s);
        }
    }
    out
}

/// First owner spelling found on `item`.
pub fn resolve_owner(item: &JsonValue) -> Option<String> {
    owner_candidates(item).into_iter().next()
}

fn owned_by(item: &JsonValue, profile_id: &str) -> bool {
    owner_candidates(item).iter().any(|c| c == profile_id)
}

fn field_string(item: &JsonValue, key: &str) -> Option<String> {
    item.get(key).and_then(id_string)
}

/// Ids of pets referenced by publications whose `ownerId` is `profile_id`.
pub fn owned_pet_ids(publications: &[JsonValue], profile_id: &str) -> HashSet<String> {
    publications
        .iter()
        .filter(|p| field_string(p, "ownerId").as_deref() == Some(profile_id))
        .filter_map(|p| field_string(p, "petId"))
        .collect()
}

/// Pets owned directly, or published by the profile.
pub fn pets_owned_by(
    pets: &[JsonValue],
    publications: &[JsonValue],
    profile_id: &str,
) -> Vec<JsonValue> {
    let published = owned_pet_ids(publications, profile_id);
    pets.iter()
        .filter(|p| {
            owned_by(p, profile_id)
                || field_string(p, "id").is_some_and(|id| published.contains(&id))
        })
        .cloned()
        .collect()
}

pub fn publications_owned_by(publications: &[JsonValue], profile_id: &str) -> Vec<JsonValue> {
    publications
        .iter()
        .filter(|p| owned_by(p, profile_id))
        .cloned()
        .collect()
}

/// Requests addressed to a shelter: its own `ownerId`, or a `petId` (legacy
/// `publicationId`) pointing at one of its pets.
pub fn requests_for_shelter(
    requests: &[JsonValue],
    pets: &[JsonValue],
    publications: &[JsonValue],
    profile_id: &str,
) -> Vec<JsonValue> {
    let pet_ids: HashSet<String> = pets_owned_by(pets, publications, profile_id)
        .iter()
        .filter_map(|p| field_string(p, "id"))
        .collect();
    requests
        .iter()
        .filter(|r| {
            if field_string(r, "ownerId").as_deref() == Some(profile_id) {
                return true;
            }
            let target = field_string(r, "petId").or_else(|| field_string(r, "publicationId"));
            target.is_some_and(|t| pet_ids.contains(&t))
        })
        .cloned()
        .collect()
}

pub fn requests_for_applicant(requests: &[JsonValue], profile_id: &str) -> Vec<JsonValue> {
    requests
        .iter()
        .filter(|r| field_string(r, "applicantId").as_deref() == Some(profile_id))
        .cloned()
        .collect()
}

/// Stamps the resolved owner into the collection's canonical owner field when the item
/// lacks it. Returns the owner that was written, if any.
pub fn normalize_owner(
    schema: &CollectionSchema,
    item: &mut Map<String, JsonValue>,
) -> Option<String> {
    let field = schema.owner_field?;
    if item.get(field).and_then(id_string).is_some() {
        return None;
    }
    let owner = resolve_owner(&JsonValue::Object(item.clone()))?;
    item.insert(field.to_string(), JsonValue::from(owner.clone()));
    Some(owner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::collection::CollectionRegistry;
    use serde_json::json;

    fn ids(rows: &[JsonValue]) -> Vec<String> {
        rows.iter().filter_map(|r| field_string(r, "id")).collect()
    }

    #[test]
    fn candidates_cover_legacy_spellings() {
        assert_eq!(resolve_owner(&json!({"profile_id": 8})), Some("8".to_string()));
        assert_eq!(
            resolve_owner(&json!({"owner": {"profileId": "ba8b"}})),
            Some("ba8b".to_string())
        );
        assert_eq!(
            resolve_owner(&json!({"owner": {"id": null, "profileId": "ba8b"}})),
            Some("ba8b".to_string())
        );
        assert_eq!(resolve_owner(&json!({"rescuedBy": "7c70"})), Some("7c70".to_string()));
        assert_eq!(resolve_owner(&json!({"name": "Toby"})), None);
    }

    #[test]
    fn pets_are_owned_directly_or_through_publications() {
        let pets = vec![
            json!({"id": "1", "profileId": "8e66"}),
            json!({"id": "2", "rescued_by": "8e66"}),
            json!({"id": "3", "profileId": "ba8b"}),
            json!({"id": "4"}),
            json!({"id": 5, "owner": {"id": 8}}),
        ];
        let pubs = vec![
            json!({"id": "pub1", "ownerId": "8e66", "petId": "4"}),
            json!({"id": "pub2", "ownerId": "ba8b", "petId": "1"}),
        ];
        assert_eq!(ids(&pets_owned_by(&pets, &pubs, "8e66")), vec!["1", "2", "4"]);
        assert_eq!(ids(&pets_owned_by(&pets, &pubs, "8")), vec!["5"]);
        assert_eq!(ids(&publications_owned_by(&pubs, "ba8b")), vec!["pub2"]);
    }

    #[test]
    fn requests_route_to_shelter_and_applicant() {
        let pets = vec![json!({"id": "p1", "profileId": "ba8b"})];
        let reqs = vec![
            json!({"id": "r1", "petId": "p1", "applicantId": "98cd"}),
            json!({"id": "r2", "publicationId": "p1", "applicantId": "98cd"}),
            json!({"id": "r3", "ownerId": "ba8b", "petId": "other"}),
            json!({"id": "r4", "petId": "p9", "applicantId": "77aa"}),
        ];
        assert_eq!(
            ids(&requests_for_shelter(&reqs, &pets, &[], "ba8b")),
            vec!["r1", "r2", "r3"]
        );
        assert_eq!(ids(&requests_for_applicant(&reqs, "98cd")), vec!["r1", "r2"]);
    }

    #[test]
    fn normalize_owner_fills_canonical_field_only_when_missing() {
        let reg = CollectionRegistry::builtin();
        let pets = reg.get("pets").unwrap();

        let mut legacy = json!({"id": "p1", "owner_id": 12}).as_object().cloned().unwrap();
        assert_eq!(normalize_owner(&pets, &mut legacy), Some("12".to_string()));
        assert_eq!(legacy["profileId"], json!("12"));

        let mut current = json!({"id": "p2", "profileId": "ba8b", "ownerId": "x"})
            .as_object()
            .cloned()
            .unwrap();
        assert_eq!(normalize_owner(&pets, &mut current), None);
        assert_eq!(current["profileId"], json!("ba8b"));

        let users = reg.get("users").unwrap();
        let mut user = json!({"id": "u1", "ownerId": "x"}).as_object().cloned().unwrap();
        assert_eq!(normalize_owner(&users, &mut user), None);
        assert!(!user.contains_key("profileId"));
    }
}
