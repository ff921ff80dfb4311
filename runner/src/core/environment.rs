//! Child environment composition

use std::collections::BTreeMap;

/// Locale variables pinned for deterministic child output
pub const LOCALE_VARS: &[&str] = &["LANG", "LC_ALL", "LC_CTYPE"];

/// Value the locale variables are pinned to
pub const NEUTRAL_LOCALE: &str = "C";

/// Changes applied on top of the inherited parent environment
///
/// Locale variables are pinned first and caller overrides are merged over
/// them, so an explicit override wins. `None` removes the variable.
pub fn child_environment(overrides: &BTreeMap<String, Option<String>>) -> BTreeMap<String, Option<String>> {
    let mut env: BTreeMap<String, Option<String>> = LOCALE_VARS
        .iter()
        .map(|var| (var.to_string(), Some(NEUTRAL_LOCALE.to_string())))
        .collect();
    env.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    env
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locale_is_pinned_without_overrides() {
        let env = child_environment(&BTreeMap::new());
        assert_eq!(env.len(), 3);
        for var in LOCALE_VARS {
            assert_eq!(env.get(*var), Some(&Some("C".to_string())));
        }
    }

    #[test]
    fn test_overrides_merge_over_locale() {
        let mut overrides = BTreeMap::new();
        overrides.insert("FOO".to_string(), Some("bar".to_string()));
        overrides.insert("LC_ALL".to_string(), Some("en_US.UTF-8".to_string()));
        overrides.insert("HOME".to_string(), None);

        let env = child_environment(&overrides);
        assert_eq!(env.get("FOO"), Some(&Some("bar".to_string())));
        assert_eq!(env.get("LC_ALL"), Some(&Some("en_US.UTF-8".to_string())));
        assert_eq!(env.get("LANG"), Some(&Some("C".to_string())));
        assert_eq!(env.get("HOME"), Some(&None));
    }
}
