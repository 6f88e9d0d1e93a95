//! The template interpolator.
//!
//! Replaces `{{key}}` placeholders with values from the context
//! accumulator.  Pure string-in/string-out: a placeholder whose key is
//! absent stays verbatim, which lets a workflow pass literal `{{...}}`
//! text through untouched rather than failing the step.

use serde_json::Value;

use steps::Context;

/// Substitute every `{{key}}` in `template` whose key is present in `ctx`.
///
/// Keys are identifier-shaped (`[A-Za-z0-9_]+`); anything else between the
/// braces is left alone.  Repeated placeholders are all substituted.
pub fn interpolate(template: &str, ctx: &Context) -> String {
    let mut out = String::with_capacity(template.len());
    let bytes = template.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'{' && i + 1 < bytes.len() && bytes[i + 1] == b'{' {
            let key_start = i + 2;
            let mut j = key_start;
            while j < bytes.len() && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'_') {
                j += 1;
            }

            let well_formed =
                j > key_start && j + 1 < bytes.len() && bytes[j] == b'}' && bytes[j + 1] == b'}';
            if well_formed {
                let key = &template[key_start..j];
                if let Some(rendered) = ctx.render(key) {
                    out.push_str(&rendered);
                    i = j + 2;
                    continue;
                }
            }
        }

        // Not a placeholder (or an unknown key): copy one byte of the
        // template verbatim.  ASCII braces never split a UTF-8 sequence.
        let ch_len = utf8_len(bytes[i]);
        out.push_str(&template[i..i + ch_len]);
        i += ch_len;
    }

    out
}

fn utf8_len(first_byte: u8) -> usize {
    match first_byte {
        b if b < 0x80 => 1,
        b if b >> 5 == 0b110 => 2,
        b if b >> 4 == 0b1110 => 3,
        _ => 4,
    }
}

/// Apply [`interpolate`] to every string in a JSON tree.
///
/// Object keys are left untouched; only values are templated.
pub fn interpolate_value(value: &Value, ctx: &Context) -> Value {
    match value {
        Value::String(s) => Value::String(interpolate(s, ctx)),
        Value::Array(items) => {
            Value::Array(items.iter().map(|item| interpolate_value(item, ctx)).collect())
        }
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(key, item)| (key.clone(), interpolate_value(item, ctx)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx_with(pairs: &[(&str, Value)]) -> Context {
        let mut ctx = Context::new();
        for (key, value) in pairs {
            ctx.insert(*key, value.clone());
        }
        ctx
    }

    #[test]
    fn known_key_is_substituted_and_unknown_stays_verbatim() {
        let ctx = ctx_with(&[("x", json!("a"))]);
        assert_eq!(interpolate("{{x}}-{{y}}", &ctx), "a-{{y}}");
    }

    #[test]
    fn text_without_placeholders_is_untouched() {
        assert_eq!(
            interpolate("no placeholders", &Context::new()),
            "no placeholders"
        );
    }

    #[test]
    fn repeated_placeholders_all_substitute() {
        let ctx = ctx_with(&[("name", json!("run"))]);
        assert_eq!(
            interpolate("{{name}} and {{name}} again", &ctx),
            "run and run again"
        );
    }

    #[test]
    fn non_string_values_render_as_compact_json() {
        let ctx = ctx_with(&[("n", json!(7)), ("step", json!({"status": 200}))]);
        assert_eq!(
            interpolate("n={{n}} step={{step}}", &ctx),
            r#"n=7 step={"status":200}"#
        );
    }

    #[test]
    fn malformed_braces_are_copied_through() {
        let ctx = ctx_with(&[("x", json!("a"))]);
        assert_eq!(interpolate("{{x} {{ x}} {{}}", &ctx), "{{x} {{ x}} {{}}");
    }

    #[test]
    fn multibyte_text_survives_interpolation() {
        let ctx = ctx_with(&[("who", json!("wörld"))]);
        assert_eq!(interpolate("héllo {{who}} ✓", &ctx), "héllo wörld ✓");
    }

    #[test]
    fn value_walk_templates_nested_strings_only() {
        let ctx = ctx_with(&[("repo", json!("acme/widgets"))]);
        let value = json!({
            "url": "https://host/{{repo}}",
            "count": 3,
            "tags": ["{{repo}}", "fixed"]
        });

        let resolved = interpolate_value(&value, &ctx);

        assert_eq!(resolved["url"], "https://host/acme/widgets");
        assert_eq!(resolved["count"], 3);
        assert_eq!(resolved["tags"][0], "acme/widgets");
        assert_eq!(resolved["tags"][1], "fixed");
    }
}
