pub mod attrs;
pub mod head;

mod entities;

pub use crate::attrs::{AttrValue, get_attr, render_attributes, write_attribute};
pub use crate::entities::{escape_attr, escape_text};
pub use crate::head::HeadTracker;

/// Format a number the way script runtimes print it: integral values carry no
/// fraction, non-finite values use their names, and magnitudes at or above
/// `1e21` or below `1e-6` switch to exponent form (`1e+21`, `1.5e-7`).
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        // Covers -0.0 as well.
        return "0".to_string();
    }
    let magnitude = n.abs();
    if magnitude >= 1e21 || magnitude < 1e-6 {
        let formatted = format!("{n:e}");
        return match formatted.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => formatted,
        };
    }
    // Display never uses exponent notation and drops a zero fraction.
    n.to_string()
}

/// Elements that never carry children or a closing tag.
pub fn is_void_element(tag: &str) -> bool {
    const VOID: &[&str] = &[
        "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
        "track", "wbr",
    ];
    VOID.iter().any(|v| v.eq_ignore_ascii_case(tag))
}
