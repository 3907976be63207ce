//! Deterministic identity for values and contexts.
//!
//! # Values
//!
//! [`normalize_value`] folds a display string to its identity: Unicode
//! compatibility decomposition with combining marks dropped, lower case,
//! whitespace runs collapsed and trimmed. It is total; every string,
//! including the empty one, has a key.
//!
//! # Contexts
//!
//! A context key is a chained blake3 digest:
//!
//! - `key(root) = H("thoughts/root")`
//! - `key(c ++ [v]) = H(key(c) || normalize(v))`
//!
//! The parent digest is fixed-width, so the concatenation is unambiguous and
//! distinct chains do not collide. Extending a known key by one value costs
//! one hash, which is what descendant rewriting relies on.

use thoughts_core::{Context, ContextKey, ValueKey, ROOT_TOKEN};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

const ROOT_DOMAIN: &[u8] = b"thoughts/root";

/// Folds case, diacritics and whitespace.
pub fn normalize_value(text: &str) -> String {
    let folded: String = text
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Key of a value in the lexeme index.
pub fn hash_thought(value: &str) -> ValueKey {
    ValueKey(normalize_value(value))
}

/// Key of the root context.
pub fn root_context_key() -> ContextKey {
    ContextKey(*blake3::hash(ROOT_DOMAIN).as_bytes())
}

/// Key of `parent ++ [value]`, given the key of `parent`.
pub fn child_context_key(parent: &ContextKey, value: &str) -> ContextKey {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&parent.0);
    hasher.update(normalize_value(value).as_bytes());
    ContextKey(*hasher.finalize().as_bytes())
}

/// Key of a whole context. A leading root token is ignored.
pub fn hash_context(context: &Context) -> ContextKey {
    let values = context.values();
    let values = match values.first() {
        Some(first) if first == ROOT_TOKEN => &values[1..],
        _ => values,
    };
    values
        .iter()
        .fold(root_context_key(), |key, value| child_context_key(&key, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_folds_case_and_whitespace() {
        assert_eq!(normalize_value("  Hello   World "), "hello world");
        assert_eq!(normalize_value("a\tb\nc"), "a b c");
        assert_eq!(normalize_value(""), "");
    }

    #[test]
    fn normalize_folds_diacritics() {
        assert_eq!(normalize_value("Café"), "cafe");
        // precomposed vs combining sequence
        assert_eq!(normalize_value("\u{e9}"), normalize_value("e\u{301}"));
    }

    #[test]
    fn visually_identical_values_collide() {
        assert_eq!(hash_thought("Apple"), hash_thought("apple "));
        assert_ne!(hash_thought("apple"), hash_thought("apples"));
    }

    #[test]
    fn root_context_is_empty_sequence() {
        assert_eq!(hash_context(&Context::root()), root_context_key());
    }

    #[test]
    fn rooted_and_unrooted_contexts_collide() {
        let unrooted = Context::new(["a", "b"]);
        let rooted: Context = serde_json::from_str(r#"["__ROOT__","a","b"]"#).unwrap();
        assert_eq!(hash_context(&rooted), hash_context(&unrooted));
    }

    #[test]
    fn context_key_is_chained() {
        let ab = hash_context(&Context::new(["a", "b"]));
        let a = hash_context(&Context::new(["a"]));
        assert_eq!(child_context_key(&a, "B"), ab);
    }

    #[test]
    fn distinct_chains_do_not_collide() {
        let cases = [
            Context::new(["ab"]),
            Context::new(["a", "b"]),
            Context::new(["b", "a"]),
            Context::new(["a", ""]),
            Context::new([""]),
            Context::root(),
        ];
        for (i, x) in cases.iter().enumerate() {
            for (j, y) in cases.iter().enumerate() {
                if i != j {
                    assert_ne!(hash_context(x), hash_context(y), "{x} vs {y}");
                }
            }
        }
    }
}
