//! Inline `style="a: b; c: d"` declarations.

fn declarations(style: &str) -> impl DoubleEndedIterator<Item = (&str, &str)> {
    style.split(';').filter_map(|decl| {
        let (k, v) = decl.split_once(':')?;
        let k = k.trim();
        (!k.is_empty()).then_some((k, v.trim()))
    })
}

pub fn get<'s>(style: &'s str, property: &str) -> Option<&'s str> {
    declarations(style)
        .rev()
        .find(|(k, _)| k.eq_ignore_ascii_case(property))
        .map(|(_, v)| v)
}

pub fn has(style: &str, property: &str) -> bool {
    get(style, property).is_some()
}

/// Returns `style` with `property` set to `value`; an existing declaration keeps its position.
pub fn set(style: &str, property: &str, value: &str) -> String {
    let mut replaced = false;
    let mut out: Vec<String> = Vec::new();
    for (k, v) in declarations(style) {
        if !k.eq_ignore_ascii_case(property) {
            out.push(format!("{k}: {v}"));
        } else if !replaced {
            out.push(format!("{k}: {value}"));
            replaced = true;
        }
    }
    if !replaced {
        out.push(format!("{property}: {value}"));
    }
    out.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_and_rewrites_declarations() {
        let style = "fill:#fff; stroke : black;;font-size: 12px";
        assert_eq!(get(style, "stroke"), Some("black"));
        assert_eq!(get(style, "FILL"), Some("#fff"));
        assert!(!has(style, "opacity"));
        assert_eq!(
            set(style, "fill", "red"),
            "fill: red; stroke: black; font-size: 12px"
        );
        assert_eq!(set("", "color", "blue"), "color: blue");
        assert_eq!(set("color: red; color: blue", "color", "green"), "color: green");
    }
}
