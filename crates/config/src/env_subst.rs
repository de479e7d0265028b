/// Replace `${ENV_VAR}` references in raw config text.
///
/// Unknown variables are left as written, so the mistake surfaces where the
/// value is used instead of silently becoming an empty string.
pub fn substitute_env(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            // Unterminated reference, keep the remainder verbatim.
            output.push_str(&rest[start..]);
            return output;
        };
        let name = &after[..end];
        match std::env::var(name) {
            Ok(value) if !name.is_empty() => output.push_str(&value),
            _ => {
                output.push_str("${");
                output.push_str(name);
                output.push('}');
            }
        }
        rest = &after[end + 1..];
    }

    output.push_str(rest);
    output
}
