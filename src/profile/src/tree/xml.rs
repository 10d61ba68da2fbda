//! Indented XML rendering

use super::Element;
use std::fmt;

const INDENT: &str = "  ";

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_element(self, f, 0)
    }
}

fn write_element(element: &Element, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        f.write_str(INDENT)?;
    }
    write!(f, "<{}", element.tag)?;
    for (key, value) in &element.attributes {
        write!(f, " {}=\"{}\"", key, Escaped { raw: value, attribute: true })?;
    }

    let text = element.text.as_deref().filter(|t| !t.is_empty());
    match (text, element.children.is_empty()) {
        (None, true) => writeln!(f, "/>"),
        (Some(text), true) => writeln!(
            f,
            ">{}</{}>",
            Escaped { raw: text, attribute: false },
            element.tag
        ),
        (text, false) => {
            f.write_str(">")?;
            if let Some(text) = text {
                write!(f, "{}", Escaped { raw: text, attribute: false })?;
            }
            f.write_str("\n")?;
            for child in &element.children {
                write_element(child, f, depth + 1)?;
            }
            for _ in 0..depth {
                f.write_str(INDENT)?;
            }
            writeln!(f, "</{}>", element.tag)
        }
    }
}

struct Escaped<'a> {
    raw: &'a str,
    attribute: bool,
}

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.raw.chars() {
            match c {
                '&' => f.write_str("&amp;")?,
                '<' => f.write_str("&lt;")?,
                '>' => f.write_str("&gt;")?,
                '"' if self.attribute => f.write_str("&quot;")?,
                c => write!(f, "{}", c)?,
            }
        }
        Ok(())
    }
}
