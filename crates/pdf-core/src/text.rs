//! Text rendering utilities

/// Context for rendering text
pub struct TextRenderContext {
    /// PDF font resource name (e.g., "F1")
    pub font_name: String,
    /// Font size in points
    pub font_size: f32,
}

/// Format a coordinate for a content stream
///
/// Rounds to three decimals and trims trailing zeros so that identical
/// layouts always serialize to identical bytes.
pub fn format_number(value: f64) -> String {
    let formatted = format!("{value:.3}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "" | "-0" => "0".to_string(),
        other => other.to_string(),
    }
}

/// Generate PDF operators for text insertion
///
/// Creates the PDF text operators (BT, Tf, Td, Tj, ET) that draw already
/// encoded text with its baseline origin at `(x, y)`.
///
/// # Arguments
/// * `encoded` - Encoded string operand (`<0041>` or `(A)`)
/// * `x` - X coordinate in points (PDF coordinates, from left)
/// * `y` - Y coordinate in points (PDF coordinates, from bottom)
/// * `ctx` - Text rendering context
pub fn generate_text_operators(encoded: &str, x: f64, y: f64, ctx: &TextRenderContext) -> Vec<u8> {
    let mut ops = String::new();

    ops.push_str("BT\n");
    ops.push_str(&format!(
        "/{} {} Tf\n",
        ctx.font_name,
        format_number(ctx.font_size as f64)
    ));
    ops.push_str(&format!("{} {} Td\n", format_number(x), format_number(y)));
    ops.push_str(&format!("{encoded} Tj\n"));
    ops.push_str("ET\n");

    ops.into_bytes()
}

/// Encode text as a PDF literal string for a WinAnsi-encoded simple font
///
/// Delimiters and backslashes are escaped, bytes above 0x7E are written as
/// octal escapes and characters outside Latin-1 become `?`.
pub fn encode_literal(text: &str) -> String {
    let mut result = String::from("(");
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                result.push('\\');
                result.push(c);
            }
            ' '..='~' => result.push(c),
            _ => {
                let code = c as u32;
                let byte = if code <= 0xFF { code } else { '?' as u32 };
                if byte < 0x20 || byte > 0x7E {
                    result.push_str(&format!("\\{byte:03o}"));
                } else {
                    result.push(byte as u8 as char);
                }
            }
        }
    }
    result.push(')');
    result
}
