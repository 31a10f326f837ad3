#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crate::transform::{localize_functions, rewrite_requires};

    fn mapping(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(raw, id)| (raw.to_string(), id.to_string()))
            .collect()
    }

    // ── require rewriting ──────────────────────────────────────────────────

    #[test]
    fn test_rewrite_standard_site() {
        let out = rewrite_requires(
            "local u = require('./util')",
            &mapping(&[("./util", "util")]),
        );
        assert_eq!(out, "local u = __load('util')");
    }

    #[test]
    fn test_rewrite_preserves_double_quotes() {
        let out = rewrite_requires(
            r#"local u = require("./util")"#,
            &mapping(&[("./util", "util")]),
        );
        assert_eq!(out, r#"local u = __load("util")"#);
    }

    #[test]
    fn test_rewrite_compact_site() {
        let out = rewrite_requires("local u = require './util'", &mapping(&[("./util", "util")]));
        assert_eq!(out, "local u = __load('util')");
    }

    #[test]
    fn test_rewrite_pcall_site() {
        let out = rewrite_requires(
            r#"local ok, m = pcall(require, "u")"#,
            &mapping(&[("u", "u")]),
        );
        assert_eq!(out, r#"local ok, m = pcall(__load, "u")"#);
    }

    #[test]
    fn test_pcall_external_unchanged() {
        let source = r#"local ok, m = pcall(require, "u")"#;
        assert_eq!(rewrite_requires(source, &mapping(&[])), source);
    }

    #[test]
    fn test_empty_mapping_is_identity() {
        let source = "local a = require('./a')\nlocal b = require 'x'\n-- require('./c')";
        assert_eq!(rewrite_requires(source, &mapping(&[])), source);
    }

    #[test]
    fn test_external_sites_pass_through() {
        let source = "local sampev = require('samp.events')\nlocal u = require('./u')";
        let out = rewrite_requires(source, &mapping(&[("./u", "u")]));
        assert!(out.contains("require('samp.events')"));
        assert!(out.contains("__load('u')"));
    }

    #[test]
    fn test_rewrite_skips_sites_in_strings() {
        let source = r#"local s = "require('./u')" local u = require('./u')"#;
        let out = rewrite_requires(source, &mapping(&[("./u", "u")]));
        assert!(out.contains(r#""require('./u')""#));
        assert!(out.contains("__load('u')"));
    }

    #[test]
    fn test_rewrite_multiple_sites_on_one_line() {
        let source = "local a, b = require('./a'), require('./b')";
        let out = rewrite_requires(source, &mapping(&[("./a", "a"), ("./b", "b")]));
        assert_eq!(out, "local a, b = __load('a'), __load('b')");
    }

    // ── auto-localization ──────────────────────────────────────────────────

    #[test]
    fn test_localize_plain_function() {
        let out = localize_functions("function helper() end");
        assert_eq!(out, "local function helper() end");
    }

    #[test]
    fn test_localize_keeps_dotted_and_local_forms() {
        let source = "function helper() end\n\
                      function sampev.onServerMessage() end\n\
                      local function already() end";
        let out = localize_functions(source);
        assert_eq!(
            out,
            "local function helper() end\n\
             function sampev.onServerMessage() end\n\
             local function already() end"
        );
    }

    #[test]
    fn test_localize_keeps_colon_methods() {
        let source = "function widget:draw() end";
        assert_eq!(localize_functions(source), source);
    }

    #[test]
    fn test_localize_skips_strings_and_comments() {
        let source = "local s = \"function fake() end\"\n-- function commented() end\nfunction real() end";
        let out = localize_functions(source);
        assert!(out.contains("\"function fake() end\""));
        assert!(out.contains("-- function commented() end"));
        assert!(out.contains("local function real() end"));
    }

    #[test]
    fn test_localize_is_idempotent() {
        let source = "function a() end\nfunction t.b() end\nlocal function c() end";
        let once = localize_functions(source);
        let twice = localize_functions(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_localize_handles_multiple_declarations() {
        let source = "function a() end\nfunction b() end\nfunction c() end";
        let out = localize_functions(source);
        assert_eq!(
            out,
            "local function a() end\nlocal function b() end\nlocal function c() end"
        );
    }

    #[test]
    fn test_localize_respects_local_with_tabs() {
        let source = "local\tfunction a() end";
        assert_eq!(localize_functions(source), source);
    }

    #[test]
    fn test_anonymous_functions_untouched() {
        let source = "local f = function() end";
        assert_eq!(localize_functions(source), source);
    }
}
