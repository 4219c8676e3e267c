use crate::errors::BridgeError;
use crate::services::host::ArgumentBag;
use crate::utils::flatten::scalar_text;
use once_cell::sync::Lazy;
use regex::Regex;

pub const CHANNEL_PLACEHOLDER: &str = "channel";

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(?P<name>[^}]+)\}").expect("placeholder regex"));

/// True when `template` contains a `{channel}` token in any casing.
pub fn references_channel(template: &str) -> bool {
    PLACEHOLDER
        .captures_iter(template)
        .any(|caps| caps["name"].eq_ignore_ascii_case(CHANNEL_PLACEHOLDER))
}

/// Verifies every non-`{channel}` token has a matching argument, so a bad
/// template is rejected before the account id is bootstrapped.
pub fn check_placeholders(template: &str, args: &ArgumentBag) -> Result<(), BridgeError> {
    for caps in PLACEHOLDER.captures_iter(template) {
        let name = &caps["name"];
        if !name.eq_ignore_ascii_case(CHANNEL_PLACEHOLDER) {
            lookup(name, args, None)?;
        }
    }
    Ok(())
}

/// Expands `{name}` tokens in `template`.
///
/// Tokens are collected from the template once, in document order, and each
/// one is substituted into the evolving path. `{channel}` maps to `identity`;
/// any other name must match an argument key ignoring case. The first
/// unresolved name aborts the whole resolution.
pub fn resolve_path(
    template: &str,
    args: &ArgumentBag,
    identity: Option<&str>,
) -> Result<String, BridgeError> {
    let trimmed = template.trim_start_matches('/');
    let tokens: Vec<(String, String)> = PLACEHOLDER
        .captures_iter(trimmed)
        .map(|caps| (caps[0].to_string(), caps["name"].to_string()))
        .collect();

    let mut path = trimmed.to_string();
    for (token, name) in tokens {
        let value = lookup(&name, args, identity)?;
        path = path.replace(&token, &value);
    }
    Ok(path)
}

fn lookup(name: &str, args: &ArgumentBag, identity: Option<&str>) -> Result<String, BridgeError> {
    if name.eq_ignore_ascii_case(CHANNEL_PLACEHOLDER) {
        return identity.map(|id| id.to_string()).ok_or_else(|| {
            BridgeError::template_resolution(
                "No account identity available for placeholder 'channel'",
            )
            .with_details(serde_json::json!({"placeholder": name}))
        });
    }
    args.find_ignore_case(name)
        .map(scalar_text)
        .ok_or_else(|| {
            BridgeError::template_resolution(format!(
                "No matching value found for placeholder '{}' in args",
                name
            ))
            .with_hint("Pass an argument with the same name (case-insensitive).")
            .with_details(serde_json::json!({"placeholder": name}))
        })
}

#[cfg(test)]
mod tests {
    use super::{check_placeholders, references_channel, resolve_path};
    use crate::errors::BridgeErrorKind;
    use crate::services::host::ArgumentBag;
    use serde_json::json;

    fn bag(pairs: &[(&str, serde_json::Value)]) -> ArgumentBag {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn channel_resolves_to_identity_and_leading_slash_is_stripped() {
        let path = resolve_path("/v2/channels/{channel}/loyalty", &bag(&[]), Some("abc123"))
            .expect("resolved");
        assert_eq!(path, "v2/channels/abc123/loyalty");
    }

    #[test]
    fn channel_match_ignores_case_and_wins_over_args() {
        let args = bag(&[("channel", json!("from-args"))]);
        let path = resolve_path("v2/{CHANNEL}/x", &args, Some("id-1")).expect("resolved");
        assert_eq!(path, "v2/id-1/x");
    }

    #[test]
    fn argument_keys_match_case_insensitively() {
        let args = bag(&[("UserName", json!("bob")), ("limit", json!(25))]);
        let path = resolve_path("points/{channel}/{username}/{LIMIT}", &args, Some("c"))
            .expect("resolved");
        assert_eq!(path, "points/c/bob/25");
    }

    #[test]
    fn unresolved_placeholder_names_the_missing_key() {
        let err = resolve_path("v2/{missing}/x", &bag(&[]), Some("c")).expect_err("must fail");
        assert_eq!(err.kind, BridgeErrorKind::TemplateResolution);
        assert!(err.message.contains("'missing'"));
        assert_eq!(err.details.expect("details")["placeholder"], "missing");
    }

    #[test]
    fn boolean_arguments_use_host_text_form() {
        let args = bag(&[("flag", json!(true))]);
        let path = resolve_path("x/{flag}", &args, None).expect("resolved");
        assert_eq!(path, "x/True");
    }

    #[test]
    fn repeated_tokens_are_all_replaced() {
        let args = bag(&[("id", json!("7"))]);
        let path = resolve_path("a/{id}/b/{id}", &args, None).expect("resolved");
        assert_eq!(path, "a/7/b/7");
    }

    #[test]
    fn substituted_text_is_not_rescanned_for_new_tokens() {
        let args = bag(&[("a", json!("{b}"))]);
        let path = resolve_path("x/{a}", &args, None).expect("resolved");
        assert_eq!(path, "x/{b}");
    }

    #[test]
    fn paths_without_tokens_pass_through() {
        let path = resolve_path("//v2/users/current", &bag(&[]), None).expect("resolved");
        assert_eq!(path, "v2/users/current");
    }

    #[test]
    fn channel_without_identity_fails_closed() {
        let err = resolve_path("v2/{channel}", &bag(&[]), None).expect_err("must fail");
        assert_eq!(err.kind, BridgeErrorKind::TemplateResolution);
    }

    #[test]
    fn check_placeholders_ignores_channel_but_not_others() {
        let args = bag(&[("id", json!(1))]);
        assert!(check_placeholders("v2/{channel}/{id}", &args).is_ok());
        let err = check_placeholders("v2/{channel}/{other}", &args).expect_err("must fail");
        assert!(err.message.contains("'other'"));
    }

    #[test]
    fn detects_channel_references() {
        assert!(references_channel("v2/{Channel}/x"));
        assert!(!references_channel("v2/users/{id}"));
    }
}
