//! Link-name enumeration for editor configuration generators.

use std::fmt::Write as _;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamesFormat {
    /// One name per line
    #[default]
    Lines,
    /// A Lua module returning a list of strings
    Lua,
    /// A JSON array of strings
    Json,
}

impl FromStr for NamesFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lines" | "text" => Ok(NamesFormat::Lines),
            "lua" => Ok(NamesFormat::Lua),
            "json" => Ok(NamesFormat::Json),
            _ => anyhow::bail!("Unknown names format: {}. Use 'lines', 'lua' or 'json'", s),
        }
    }
}

/// Render link names in layout order.
pub fn render_link_names<S: AsRef<str>>(names: &[S], format: NamesFormat) -> anyhow::Result<String> {
    let mut out = String::new();
    match format {
        NamesFormat::Lines => {
            for name in names {
                out.push_str(name.as_ref());
                out.push('\n');
            }
        }
        NamesFormat::Lua => {
            out.push_str("return {\n");
            for name in names {
                writeln!(out, "  {},", lua_string(name.as_ref()))?;
            }
            out.push_str("}\n");
        }
        NamesFormat::Json => {
            let names: Vec<&str> = names.iter().map(|n| n.as_ref()).collect();
            out = serde_json::to_string_pretty(&names)?;
            out.push('\n');
        }
    }
    Ok(out)
}

fn lua_string(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('"');
    for c in s.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            c if c.is_control() => {
                let _ = write!(quoted, "\\{}", c as u32);
            }
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
