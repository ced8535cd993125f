//! Helpers for partial updates.
//!
//! Nullable columns are patched through `Option<Option<T>>`: an absent key
//! leaves the value alone, `null` clears it, a value replaces it.

use serde::{Deserialize, Deserializer};

/// Deserialize a present key (even `null`) as `Some(..)`.
///
/// Use together with `#[serde(default)]` so that missing keys become `None`.
pub fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Overwrite `target` when the patch carries a value.
pub fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *target = v;
    }
}

/// Overwrite a nullable `target` when the patch key was present.
pub fn set_nullable<T>(target: &mut Option<T>, value: Option<Option<T>>) {
    if let Some(v) = value {
        *target = v;
    }
}

/// Trim a text field and treat blank input as `None`.
pub fn clean_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "deserialize_some")]
        note: Option<Option<String>>,
    }

    #[test]
    fn distinguishes_absent_null_and_value() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        let null: Patch = serde_json::from_str(r#"{"note": null}"#).unwrap();
        let value: Patch = serde_json::from_str(r#"{"note": "hi"}"#).unwrap();

        assert_eq!(absent.note, None);
        assert_eq!(null.note, Some(None));
        assert_eq!(value.note, Some(Some("hi".to_string())));

        let mut target = Some("old".to_string());
        set_nullable(&mut target, absent.note);
        assert_eq!(target.as_deref(), Some("old"));
        set_nullable(&mut target, null.note);
        assert_eq!(target, None);
    }

    #[test]
    fn clean_text_drops_blank() {
        assert_eq!(clean_text(Some("  ".into())), None);
        assert_eq!(clean_text(Some(" a ".into())), Some("a".into()));
    }
}
