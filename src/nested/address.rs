use crate::error::{Error, Result};
use crate::zip::NESTED_SEPARATOR;

const SCHEME: &str = "jar:";
const CURRENT_DIR: &str = "/./";
const PARENT_DIR: &str = "/../";

/// A parsed nested address: `[jar:]<root-locator>!/<path>(!/<path>)*`.
///
/// The root locator names the outermost archive (a `file:` URL, a bare
/// filesystem path, or an `http(s)://` URL); each further segment names an
/// entry one nesting level deeper. Two addresses are equal iff their
/// normalized segment sequences are equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    /// Locator of the outermost archive.
    pub root: String,
    /// Entry path at each nesting level, outermost first.
    pub segments: Vec<String>,
}

impl Address {
    /// Parse and normalize an address string.
    ///
    /// A trailing `!/` (addressing a container itself rather than an entry
    /// in it) is accepted and yields no extra segment.
    pub fn parse(spec: &str) -> Result<Address> {
        let bad = |detail: &str| Error::InvalidAddress(spec.to_string(), detail.to_string());

        // The prefix slice must respect char boundaries: a multi-byte root
        // locator simply fails the scheme match.
        let rest = match spec.get(..SCHEME.len()) {
            Some(prefix) if prefix.eq_ignore_ascii_case(SCHEME) => &spec[SCHEME.len()..],
            _ => spec,
        };

        let normalized = normalize(rest);
        let mut parts = normalized.split(NESTED_SEPARATOR);
        let root = parts.next().unwrap_or_default().to_string();
        if root.is_empty() {
            return Err(bad("empty root locator"));
        }

        let mut segments: Vec<String> = parts.map(str::to_string).collect();
        if segments.last().is_some_and(String::is_empty) {
            segments.pop();
        }
        if segments.iter().any(String::is_empty) {
            return Err(bad("empty path segment between '!/' separators"));
        }

        Ok(Address { root, segments })
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.root)?;
        for segment in &self.segments {
            write!(f, "{NESTED_SEPARATOR}{segment}")?;
        }
        Ok(())
    }
}

/// Collapse `/./` and resolve `/../` within the last `!/`-delimited
/// component only. A `..` never crosses a `!/` boundary: that would reach
/// into a different archive's namespace.
pub fn normalize(spec: &str) -> String {
    if !spec.contains(CURRENT_DIR) && !spec.contains(PARENT_DIR) {
        return spec.to_string();
    }
    let after_separator = match spec.rfind(NESTED_SEPARATOR) {
        Some(i) => i + NESTED_SEPARATOR.len(),
        None => 0,
    };
    let mut tail = replace_parent_dir(&spec[after_separator..]);
    tail = tail.replace(CURRENT_DIR, "/");
    format!("{}{}", &spec[..after_separator], tail)
}

fn replace_parent_dir(component: &str) -> String {
    let mut component = component.to_string();
    while let Some(parent_at) = component.find(PARENT_DIR) {
        match component[..parent_at].rfind('/') {
            Some(slash_at) => {
                component = format!(
                    "{}{}",
                    &component[..slash_at],
                    &component[parent_at + PARENT_DIR.len() - 1..]
                );
            }
            // Nothing left to pop inside this component; the leading slash
            // is consumed and whatever remains is looked up literally. A
            // `..` can never escape past the component's start.
            None => component = component[parent_at + PARENT_DIR.len()..].to_string(),
        }
    }
    component
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scheme_root_and_segments() {
        let addr = Address::parse("jar:file:/opt/app.jar!/lib/inner.jar!/com/x/Y.class").unwrap();
        assert_eq!(addr.root, "file:/opt/app.jar");
        assert_eq!(addr.segments, vec!["lib/inner.jar", "com/x/Y.class"]);
    }

    #[test]
    fn scheme_is_optional_and_case_insensitive() {
        let a = Address::parse("JAR:app.jar!/x.txt").unwrap();
        let b = Address::parse("app.jar!/x.txt").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn multibyte_root_locator_parses() {
        // The scheme check must not slice inside a multi-byte character.
        let addr = Address::parse("日志.jar!/x.txt").unwrap();
        assert_eq!(addr.root, "日志.jar");
        assert_eq!(addr.segments, vec!["x.txt"]);

        let short = Address::parse("日").unwrap();
        assert_eq!(short.root, "日");
        assert!(short.segments.is_empty());
    }

    #[test]
    fn trailing_separator_addresses_the_container() {
        let addr = Address::parse("app.jar!/lib/inner.jar!/").unwrap();
        assert_eq!(addr.segments, vec!["lib/inner.jar"]);
    }

    #[test]
    fn rejects_empty_root_and_empty_segments() {
        assert!(Address::parse("!/x").is_err());
        assert!(Address::parse("app.jar!/!/x").is_err());
    }

    #[test]
    fn collapses_current_dir_in_last_component() {
        assert_eq!(normalize("app.jar!/a/./b/c.txt"), "app.jar!/a/b/c.txt");
    }

    #[test]
    fn resolves_parent_dir_in_last_component() {
        assert_eq!(normalize("app.jar!/a/b/../c.txt"), "app.jar!/a/c.txt");
        assert_eq!(normalize("app.jar!/a/b/../../c.txt"), "app.jar!/c.txt");
    }

    #[test]
    fn parent_dir_never_crosses_a_nesting_boundary() {
        // The earlier components contain dot segments too, but only the
        // last one is rewritten.
        assert_eq!(
            normalize("app.jar!/lib/./x.jar!/d/../e.txt"),
            "app.jar!/lib/./x.jar!/e.txt"
        );
        // An unresolvable `..` stays in the component (and will simply miss
        // on lookup) instead of escaping into the outer archive.
        assert_eq!(normalize("app.jar!/a/../../b.txt"), "app.jar!/../b.txt");
    }

    #[test]
    fn display_round_trips() {
        let spec = "file:/opt/app.jar!/lib/inner.jar!/com/x/Y.class";
        assert_eq!(Address::parse(spec).unwrap().to_string(), spec);
    }
}
