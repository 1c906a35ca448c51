//! Identifier and literal helpers for C++ output

use once_cell::sync::Lazy;
use std::collections::HashSet;

static CPP_KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "alignas", "alignof", "and", "and_eq", "asm", "auto", "bitand", "bitor", "bool", "case",
        "catch", "char", "char16_t", "char32_t", "class", "compl", "concept", "const",
        "const_cast", "consteval", "constexpr", "constinit", "continue", "co_await",
        "co_return", "co_yield", "decltype", "default", "delete", "do", "double",
        "dynamic_cast", "else", "enum", "explicit", "export", "extern", "false", "float", "for",
        "friend", "goto", "if", "inline", "int", "long", "mutable", "namespace", "new",
        "noexcept", "not", "not_eq", "nullptr", "operator", "or", "or_eq", "private",
        "protected", "public", "register", "reinterpret_cast", "requires", "return", "short",
        "signed", "sizeof", "static", "static_assert", "static_cast", "struct", "switch",
        "template", "this", "thread_local", "throw", "true", "try", "typedef", "typeid",
        "typename", "union", "unsigned", "using", "virtual", "void", "volatile", "wchar_t",
        "while", "xor", "xor_eq", "std", "goxx", "NULL",
    ]
    .into_iter()
    .collect()
});

/// Make a Go identifier safe to use in C++
pub fn sanitize_identifier(name: &str) -> String {
    if CPP_KEYWORDS.contains(name) {
        format!("{}_", name)
    } else {
        name.to_string()
    }
}

/// C++ namespace for a Go package
///
/// `main` would clash with the global `int main()`.
pub fn namespace_name(package: &str) -> String {
    match package {
        "main" => "main_".to_string(),
        other => sanitize_identifier(other),
    }
}

/// C++ spelling of a Go integer literal
pub fn int_literal(value: &str) -> String {
    let digits = value.replace('_', "");
    if let Some(octal) = digits
        .strip_prefix("0o")
        .or_else(|| digits.strip_prefix("0O"))
    {
        return format!("0{}", octal);
    }
    digits
}

/// C++ spelling of a Go string literal (quoted source text)
pub fn string_literal(value: &str) -> String {
    if let Some(raw) = value
        .strip_prefix('`')
        .and_then(|v| v.strip_suffix('`'))
    {
        format!("std::string(R\"goxx({})goxx\")", raw)
    } else {
        format!("std::string({})", value)
    }
}

/// C++ spelling of a Go rune literal
pub fn char_literal(value: &str) -> String {
    format!("U{}", value)
}
