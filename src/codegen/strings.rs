//! String and char method emission.
//!
//! Operations without a direct std::string equivalent emit as inline
//! lambdas so the generated program does not need a runtime string library.

/// Emits an extended str method call, or `None` when the method maps
/// directly onto std::string (`length`, `empty`, `contains`, `starts_with`,
/// `ends_with`, `find`, `substr`).
pub fn emit_str_method_call(method: &str, obj_str: &str, args: &[String]) -> Option<String> {
    match method {
        "upper" => Some(format!(
            "[](std::string s) {{ std::transform(s.begin(), s.end(), s.begin(), ::toupper); return s; }}({obj_str})"
        )),
        "lower" => Some(format!(
            "[](std::string s) {{ std::transform(s.begin(), s.end(), s.begin(), ::tolower); return s; }}({obj_str})"
        )),
        "capitalize" => Some(format!(
            "[](std::string s) {{ if (s.empty()) return s; std::transform(s.begin(), s.end(), s.begin(), ::tolower); s[0] = std::toupper(s[0]); return s; }}({obj_str})"
        )),
        "title" => Some(format!(
            "[](std::string s) {{ bool new_word = true; for (size_t i = 0; i < s.size(); ++i) {{ if (std::isspace(s[i])) {{ new_word = true; }} else if (new_word) {{ s[i] = std::toupper(s[i]); new_word = false; }} else {{ s[i] = std::tolower(s[i]); }} }} return s; }}({obj_str})"
        )),
        "trim" => Some(format!(
            "[](std::string s) {{ size_t start = s.find_first_not_of(\" \\t\\n\\r\\f\\v\"); if (start == std::string::npos) return std::string(); size_t end = s.find_last_not_of(\" \\t\\n\\r\\f\\v\"); return s.substr(start, end - start + 1); }}({obj_str})"
        )),
        "trim_left" => Some(format!(
            "[](std::string s) {{ size_t start = s.find_first_not_of(\" \\t\\n\\r\\f\\v\"); if (start == std::string::npos) return std::string(); return s.substr(start); }}({obj_str})"
        )),
        "trim_right" => Some(format!(
            "[](std::string s) {{ size_t end = s.find_last_not_of(\" \\t\\n\\r\\f\\v\"); if (end == std::string::npos) return std::string(); return s.substr(0, end + 1); }}({obj_str})"
        )),
        "replace" => Some(format!(
            "[](std::string s, const std::string& from, const std::string& to) {{ if (from.empty()) return s; size_t pos = s.find(from); if (pos != std::string::npos) {{ s.replace(pos, from.length(), to); }} return s; }}({obj_str}, {}, {})",
            args[0], args[1]
        )),
        "replace_all" => Some(format!(
            "[](std::string s, const std::string& from, const std::string& to) {{ if (from.empty()) return s; size_t pos = 0; while ((pos = s.find(from, pos)) != std::string::npos) {{ s.replace(pos, from.length(), to); pos += to.length(); }} return s; }}({obj_str}, {}, {})",
            args[0], args[1]
        )),
        "reverse" => Some(format!(
            "[](std::string s) {{ std::reverse(s.begin(), s.end()); return s; }}({obj_str})"
        )),
        "repeat" => Some(format!(
            "[](const std::string& s, int n) {{ std::string result; result.reserve(s.size() * n); for (int i = 0; i < n; ++i) result += s; return result; }}({obj_str}, {})",
            args[0]
        )),
        "split" => Some(format!(
            "[](const std::string& s, const std::string& delim) {{ std::vector<std::string> result; if (delim.empty()) {{ result.push_back(s); return result; }} size_t start = 0, end = 0; while ((end = s.find(delim, start)) != std::string::npos) {{ result.push_back(s.substr(start, end - start)); start = end + delim.length(); }} result.push_back(s.substr(start)); return result; }}({obj_str}, {})",
            args[0]
        )),
        "split_lines" => Some(format!(
            "[](const std::string& s) {{ std::vector<std::string> result; size_t start = 0, end = 0; while ((end = s.find('\\n', start)) != std::string::npos) {{ result.push_back(s.substr(start, end - start)); start = end + 1; }} result.push_back(s.substr(start)); return result; }}({obj_str})"
        )),
        "pad_left" => Some(format!(
            "[](const std::string& s, int w, char c) {{ if (static_cast<int>(s.size()) >= w) return s; return std::string(w - s.size(), c) + s; }}({obj_str}, {}, {})",
            args[0],
            fill_char(args.get(1))
        )),
        "pad_right" => Some(format!(
            "[](const std::string& s, int w, char c) {{ if (static_cast<int>(s.size()) >= w) return s; return s + std::string(w - s.size(), c); }}({obj_str}, {}, {})",
            args[0],
            fill_char(args.get(1))
        )),
        "center" => Some(format!(
            "[](const std::string& s, int w, char c) {{ if (static_cast<int>(s.size()) >= w) return s; int total_pad = w - s.size(); int left_pad = total_pad / 2; int right_pad = total_pad - left_pad; return std::string(left_pad, c) + s + std::string(right_pad, c); }}({obj_str}, {}, {})",
            args[0],
            fill_char(args.get(1))
        )),
        "to_int" => Some(format!("std::stoi({obj_str})")),
        "to_float" => Some(format!("std::stod({obj_str})")),
        _ => None,
    }
}

/// The fill argument arrives as a one-character Bishop string; the padding
/// lambdas take a char.
fn fill_char(arg: Option<&String>) -> String {
    match arg {
        Some(arg) => format!("({arg})[0]"),
        None => "' '".to_owned(),
    }
}

/// Emits a char method call, or `None` for an unrecognised method.
pub fn emit_char_method_call(method: &str, obj_str: &str) -> Option<String> {
    match method {
        "is_alpha" => Some(format!(
            "static_cast<bool>(std::isalpha(static_cast<unsigned char>({obj_str})))"
        )),
        "is_digit" => Some(format!(
            "static_cast<bool>(std::isdigit(static_cast<unsigned char>({obj_str})))"
        )),
        "is_whitespace" => Some(format!(
            "static_cast<bool>(std::isspace(static_cast<unsigned char>({obj_str})))"
        )),
        "is_upper" => Some(format!(
            "static_cast<bool>(std::isupper(static_cast<unsigned char>({obj_str})))"
        )),
        "is_lower" => Some(format!(
            "static_cast<bool>(std::islower(static_cast<unsigned char>({obj_str})))"
        )),
        "to_upper" => Some(format!(
            "static_cast<char>(std::toupper(static_cast<unsigned char>({obj_str})))"
        )),
        "to_lower" => Some(format!(
            "static_cast<char>(std::tolower(static_cast<unsigned char>({obj_str})))"
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_methods_fall_through() {
        assert!(emit_str_method_call("length", "s", &[]).is_none());
        assert!(emit_str_method_call("contains", "s", &["x".into()]).is_none());
    }

    #[test]
    fn test_upper_emits_inline_lambda() {
        let out = emit_str_method_call("upper", "s", &[]).expect("upper is extended");
        assert!(out.contains("::toupper"));
        assert!(out.ends_with("(s)"));
    }

    #[test]
    fn test_pad_left_defaults_fill_to_space() {
        let out = emit_str_method_call("pad_left", "s", &["5".into()]).expect("pad_left");
        assert!(out.contains("' '"));

        let out =
            emit_str_method_call("pad_left", "s", &["5".into(), "zero".into()]).expect("pad_left");
        assert!(out.contains("(zero)[0]"));
    }

    #[test]
    fn test_char_methods() {
        let out = emit_char_method_call("is_digit", "c").expect("is_digit");
        assert!(out.contains("std::isdigit"));
        assert!(emit_char_method_call("explode", "c").is_none());
    }
}
