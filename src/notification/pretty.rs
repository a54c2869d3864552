//! 结构化美化输出 - 将任意嵌套的返回值渲染为可读文本
//!
//! 放得下一行（80 列）就单行输出，否则每个元素单独一行，
//! 按嵌套层级缩进，闭合括号紧跟最后一个元素。

use serde_json::Value;

/// 单行最大宽度
const WIDTH: usize = 80;

/// 美化输出任意 JSON 值
pub fn pretty(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value, 0);
    out
}

/// 单行紧凑输出
pub fn compact(value: &Value) -> String {
    match value {
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(compact).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let parts: Vec<String> = entries
                .into_iter()
                .map(|(k, v)| format!("{}: {}", scalar(&Value::String(k.clone())), compact(v)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
        other => scalar(other),
    }
}

fn scalar(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/// 显示宽度按字符计
fn width(text: &str) -> usize {
    text.chars().count()
}

fn write_value(out: &mut String, value: &Value, indent: usize) {
    let flat = compact(value);
    if indent + width(&flat) <= WIDTH {
        out.push_str(&flat);
        return;
    }

    match value {
        Value::Array(items) if !items.is_empty() => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(",\n");
                    out.push_str(&" ".repeat(indent + 1));
                }
                write_value(out, item, indent + 1);
            }
            out.push(']');
        }
        Value::Object(map) if !map.is_empty() => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push_str(",\n");
                    out.push_str(&" ".repeat(indent + 1));
                }
                let key = scalar(&Value::String(key.clone()));
                out.push_str(&key);
                out.push_str(": ");
                write_value(out, item, indent + 1 + width(&key) + 2);
            }
            out.push('}');
        }
        _ => out.push_str(&flat),
    }
}
