//! Template directive rewriting.
//!
//! Turns the small `{#each}` / `{#if}` / `{expr}` language into petite-vue
//! directives with three ordered regex passes:
//!
//! ```text
//! {#each items as it, i}…{/each}  →  <template v-for="(it,i) in items">…</template>
//! {#if ok}…{/if}                  →  <template v-if="ok">…</template>
//! {expr}                          →  {{ expr }}
//! ```
//!
//! Block bodies are matched lazily up to the nearest closing marker of the
//! same kind, so a block cannot contain another block of the same kind.
//! An `{#each}` inside an `{#if}` (or the reverse) is fine.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::config::{ERROR_BLOCK_STYLE, LOADING_STYLE, LOADING_TEXT, SCOPE_ERROR_FIELD, SCOPE_LOADING_FIELD};

static EACH_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\{#each\s+([^}]+?)\s+as\s+([A-Za-z_$][A-Za-z0-9_$]*)(?:\s*,\s*([A-Za-z_$][A-Za-z0-9_$]*))?\}([\s\S]*?)\{/each\}",
    )
    .expect("each pattern is valid")
});

static IF_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{#if\s+([^}]+)\}([\s\S]*?)\{/if\}").expect("if pattern is valid")
});

// The first alternative skips well-formed host interpolations so a second pass is a no-op.
static INTERPOLATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{[^{}]*\}\}|\{([^{}]+)\}").expect("interpolation pattern is valid")
});

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("identifier pattern is valid")
});

/// Rewrite directive markup into petite-vue syntax.
pub fn rewrite(markup: &str) -> String {
    if markup.is_empty() {
        return String::new();
    }

    let markup = rewrite_each(markup);
    let markup = rewrite_if(&markup);
    rewrite_interpolations(&markup)
}

fn rewrite_each(markup: &str) -> String {
    EACH_BLOCK
        .replace_all(markup, |caps: &Captures| {
            let list = &caps[1];
            let item = &caps[2];
            let body = &caps[4];
            match caps.get(3) {
                Some(index) => format!(
                    r#"<template v-for="({},{}) in {}">{}</template>"#,
                    item,
                    index.as_str(),
                    list,
                    body
                ),
                None => format!(r#"<template v-for="({}) in {}">{}</template>"#, item, list, body),
            }
        })
        .into_owned()
}

fn rewrite_if(markup: &str) -> String {
    IF_BLOCK
        .replace_all(markup, |caps: &Captures| {
            format!(r#"<template v-if="{}">{}</template>"#, &caps[1], &caps[2])
        })
        .into_owned()
}

fn rewrite_interpolations(markup: &str) -> String {
    INTERPOLATION
        .replace_all(markup, |caps: &Captures| match caps.get(1) {
            Some(expr) => format!("{{{{ {} }}}}", expr.as_str().trim()),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Whether `name` can be used as a scope binding.
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Initial `v-scope` expression for a container bound to `binding`.
pub fn scope_expression(binding: &str) -> String {
    format!(
        "{{ {}: {{}}, {}: null, {}: true }}",
        binding, SCOPE_ERROR_FIELD, SCOPE_LOADING_FIELD
    )
}

/// Wrap a rewritten template in the three-state presentation shell.
///
/// Exactly one branch renders at a time: the error block while an error is
/// set, the loading placeholder while loading, otherwise the template.
pub fn wrap_presentation(template: &str) -> String {
    format!(
        r#"
      <template v-if="!{err}">
        <template v-if="!{loading}">
          {template}
        </template>
        <span v-else style="{loading_style}">{loading_text}</span>
      </template>
      <pre v-else style="{error_style}">{{{{ {err} }}}}</pre>
    "#,
        err = SCOPE_ERROR_FIELD,
        loading = SCOPE_LOADING_FIELD,
        template = template,
        loading_style = LOADING_STYLE,
        loading_text = LOADING_TEXT,
        error_style = ERROR_BLOCK_STYLE,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_rewrite() {
        let out = rewrite("{#each items as it}<li>{it}</li>{/each}");
        assert_eq!(out, r#"<template v-for="(it) in items"><li>{{ it }}</li></template>"#);
        assert_eq!(out.matches("<li>").count(), 1);
    }

    #[test]
    fn test_each_with_index() {
        let out = rewrite("{#each data.rows as row , i}<p>{i}: {row.name}</p>{/each}");
        assert_eq!(
            out,
            r#"<template v-for="(row,i) in data.rows"><p>{{ i }}: {{ row.name }}</p></template>"#
        );
    }

    #[test]
    fn test_if_rewrite() {
        let out = rewrite("{#if ok}<b>yes</b>{/if}");
        assert_eq!(out, r#"<template v-if="ok"><b>yes</b></template>"#);
    }

    #[test]
    fn test_interpolation_trims_expression() {
        assert_eq!(rewrite("<p>{  user.name  }</p>"), "<p>{{ user.name }}</p>");
    }

    #[test]
    fn test_different_kinds_nest() {
        let out = rewrite("{#each rows as r}{#if r.ok}<i>{r.id}</i>{/if}{/each}");
        assert_eq!(
            out,
            r#"<template v-for="(r) in rows"><template v-if="r.ok"><i>{{ r.id }}</i></template></template>"#
        );
    }

    #[test]
    fn test_same_kind_nesting_is_not_supported() {
        // The inner closing marker ends the outer block.
        let out = rewrite("{#if a}{#if b}x{/if}y{/if}");
        assert_eq!(out, r#"<template v-if="a">{{ #if b }}x</template>y{{ /if }}"#);
    }

    #[test]
    fn test_second_rewrite_is_noop() {
        let once = rewrite("{#each items as it, n}<li>{n}. {it}</li>{/each}{#if done}ok{/if}{total}");
        assert_eq!(rewrite(&once), once);
    }

    #[test]
    fn test_existing_host_interpolation_untouched() {
        assert_eq!(rewrite("{{ a }} and {b}"), "{{ a }} and {{ b }}");
    }

    #[test]
    fn test_unbalanced_double_brace_does_not_hide_later_expressions() {
        let out = rewrite("<a>{{ x }</a><b>{y}</b><c>{{ z }}</c>");
        assert_eq!(out, "<a>{{{ x }}</a><b>{{ y }}</b><c>{{ z }}</c>");
    }

    #[test]
    fn test_multiline_body() {
        let out = rewrite("{#each list as x}\n  <tr>\n    <td>{x}</td>\n  </tr>\n{/each}");
        assert!(out.starts_with(r#"<template v-for="(x) in list">"#));
        assert!(out.contains("<td>{{ x }}</td>"));
        assert!(out.ends_with("</template>"));
    }

    #[test]
    fn test_unclosed_block_falls_through_to_interpolation() {
        assert_eq!(rewrite("{#if open}text"), "{{ #if open }}text");
    }

    #[test]
    fn test_empty_markup() {
        assert_eq!(rewrite(""), "");
    }

    #[test]
    fn test_scope_expression() {
        assert_eq!(scope_expression("rows"), "{ rows: {}, __err: null, __loading: true }");
    }

    #[test]
    fn test_presentation_shell_has_three_states() {
        let shell = wrap_presentation("<ul></ul>");
        assert!(shell.contains(r#"<template v-if="!__err">"#));
        assert!(shell.contains(r#"<template v-if="!__loading">"#));
        assert!(shell.contains("<ul></ul>"));
        assert!(shell.contains("Loading…"));
        assert!(shell.contains("{{ __err }}</pre>"));
    }

    #[test]
    fn test_identifier_check() {
        assert!(is_identifier("data"));
        assert!(is_identifier("$rows_2"));
        assert!(!is_identifier("2rows"));
        assert!(!is_identifier("a b"));
        assert!(!is_identifier(""));
    }
}
