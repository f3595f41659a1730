#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::error::GroupError;
    use serde_json::json;

    fn input(value: serde_json::Value) -> GroupInput {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_minimal_input_gets_defaults() {
        let group = normalize(&input(json!({"name": "Team A", "admin": "u1"})), "g1".into())
            .unwrap();

        assert_eq!(group.id, "g1");
        assert_eq!(group.name, "Team A");
        assert_eq!(group.admins, vec!["u1"]);
        assert!(group.users.is_empty());
        assert!(group.pads.is_empty());
        assert_eq!(group.visibility, Visibility::Restricted);
        assert_eq!(group.password, None);
        assert!(!group.readonly);
    }

    #[test]
    fn test_missing_or_empty_mandatory_fields_fail() {
        for bad in [
            json!({"admin": "u1"}),
            json!({"name": "", "admin": "u1"}),
            json!({"name": 7, "admin": "u1"}),
            json!({"name": "ok"}),
            json!({"name": "ok", "admin": ""}),
            json!({"name": "ok", "admin": ["u1"]}),
        ] {
            let result = normalize(&input(bad), "g1".into());
            assert!(matches!(result, Err(GroupError::Validation(_))));
        }
    }

    #[test]
    fn test_non_string_admin_entries_are_dropped() {
        let group = normalize(
            &input(json!({
                "name": "Team B",
                "admin": "u1",
                "admins": ["u2", 42, null, "u2"],
                "visibility": "private",
                "password": "secret"
            })),
            "g1".into(),
        )
        .unwrap();

        assert_eq!(group.admins, vec!["u1", "u2"]);
        assert_eq!(group.visibility, Visibility::Private);
        assert_eq!(group.password, Some("secret".into()));
    }

    #[test]
    fn test_membership_lists_are_deduplicated() {
        let group = normalize(
            &input(json!({
                "name": "t",
                "admin": "u1",
                "admins": ["u1"],
                "users": ["u2", "u2", 3, "u3"],
                "pads": ["p1", "p1"]
            })),
            "g1".into(),
        )
        .unwrap();

        assert_eq!(group.admins, vec!["u1"]);
        assert_eq!(group.users, vec!["u2", "u3"]);
        assert_eq!(group.pads, vec!["p1"]);
    }

    #[test]
    fn test_unknown_visibility_normalizes_to_restricted() {
        for vis in [json!("hidden"), json!(12), json!(null)] {
            let group = normalize(
                &input(json!({"name": "t", "admin": "u1", "visibility": vis})),
                "g1".into(),
            )
            .unwrap();
            assert_eq!(group.visibility, Visibility::Restricted);
        }
    }

    #[test]
    fn test_wrongly_typed_optionals_fall_back() {
        let group = normalize(
            &input(json!({"name": "t", "admin": "u1", "password": 99, "readonly": "yes"})),
            "g1".into(),
        )
        .unwrap();

        assert_eq!(group.password, None);
        assert!(!group.readonly);
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let group = normalize(
            &input(json!({
                "name": "Team C",
                "admin": "u1",
                "admins": ["u2"],
                "users": ["u3"],
                "pads": ["p1"],
                "visibility": "public",
                "readonly": true
            })),
            "g1".into(),
        )
        .unwrap();

        let again = normalize(&group.as_input(), group.id.clone()).unwrap();
        assert_eq!(again, group);
    }

    #[test]
    fn test_visibility_string_mapping() {
        assert_eq!(Visibility::from_str("private"), Visibility::Private);
        assert_eq!(Visibility::from_str("public"), Visibility::Public);
        assert_eq!(Visibility::from_str("restricted"), Visibility::Restricted);
        assert_eq!(Visibility::from_str("anything"), Visibility::Restricted);
        assert_eq!(Visibility::Private.as_str(), "private");
    }
}
