// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// Characters which force a literal out of the bare (unquoted) form.
const METACHARACTERS: &str = "$[]{}\"\u{c}\r\n\t\u{b} ";

/// Quote a literal string so the language tokenizer reads back
/// exactly the original value.  The empty string becomes `{}`;
/// strings without metacharacters are left bare; strings with
/// balanced braces are brace-quoted (newlines and tabs print
/// literally, which reads best for multiline strings); everything
/// else falls back to a backslash-escaped double-quoted form.
pub fn quote(val: &str) -> String {
    if val.is_empty() {
        return "{}".to_string();
    }
    if !val.chars().any(|c| METACHARACTERS.contains(c)) {
        return val.to_string();
    }
    // Check whether the braces in the string balance.
    let mut level = 0i64;
    let mut balanced = true;
    for c in val.chars() {
        if c == '{' {
            level += 1;
        } else if c == '}' {
            level -= 1;
        }
        if level < 0 {
            balanced = false;
            break;
        }
    }
    balanced = balanced && level == 0;
    //
    if !balanced || val.chars().any(|c| "\u{c}\r\u{b}".contains(c)) {
        // Escape order matters: backslash itself must go first.
        let escaped = val
            .replace('\\', "\\\\")
            .replace('\u{c}', "\\f")
            .replace('\r', "\\r")
            .replace('\n', "\\n")
            .replace('\t', "\\t")
            .replace('\u{b}', "\\v")
            .replace('}', "\\}")
            .replace('{', "\\{")
            .replace('"', "\\\"")
            .replace('[', "\\[")
            .replace(']', "\\]")
            .replace('$', "\\$");
        format!("\"{}\"", escaped)
    } else {
        format!("{{{}}}", val)
    }
}
