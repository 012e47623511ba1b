// Substitutes `:key` placeholders with the given values.
pub fn apply_pattern_string(pattern: &str, vars: &[(&str, &str)]) -> String {
    let mut out = pattern.to_string();
    for (key, value) in vars {
        out = out.replace(&format!(":{key}"), value);
    }
    out
}
