//! Theming engine: settings snapshot in, concrete stylesheet out.
//!
//! DESIGN
//! ======
//! Every mapping is a closed enumeration with an explicit default, so a
//! missing or unrecognized token can never produce an empty render. The
//! dark-background check is intentionally a membership test against the two
//! known dark panel values, not a luminance computation; generalizing it
//! would change behavior for owners relying on the current palette.

use crate::settings::Settings;

/// Identifier of the widget's single style element.
pub const STYLE_ID: &str = "aiofc-styles";

/// Class prefix shared by every widget style rule.
pub const CLASS_PREFIX: &str = "aiofc-";

const DEFAULT_THEME_COLOR: &str = "#6366f1";
const DEFAULT_THEME_TEXT: &str = "#ffffff";
const DEFAULT_USER_BUBBLE: &str = "linear-gradient(135deg,#6366f1,#06b6d4)";
const DEFAULT_PANEL_BG: &str = "#ffffff";

/// The two panel backgrounds treated as dark themes.
const DARK_BACKGROUNDS: [&str; 2] = ["#0f172a", "#1f2937"];

/// Gradient end-color offset applied to the theme color.
const GRADIENT_SHIFT: i32 = -18;

/// Font-size token to pixel value. Unknown or absent tokens map to `base`.
#[must_use]
pub fn font_size_px(token: Option<&str>) -> u32 {
    match token.unwrap_or("base") {
        "xs" => 12,
        "sm" => 13,
        "lg" => 16,
        "xl" => 18,
        _ => 14,
    }
}

/// Corner-radius token to pixel value for the panel shell.
#[must_use]
pub fn panel_radius_px(token: Option<&str>) -> u32 {
    match token.unwrap_or("md") {
        "none" => 0,
        "sm" => 8,
        "lg" => 16,
        "xl" => 20,
        "full" => 24,
        _ => 12,
    }
}

/// Corner-radius token to pixel value for message bubbles. One step tighter
/// than the panel table; `full` pills the bubble outright.
#[must_use]
pub fn bubble_radius_px(token: Option<&str>) -> u32 {
    match token.unwrap_or("md") {
        "none" => 0,
        "sm" => 6,
        "lg" => 14,
        "xl" => 18,
        "full" => 999,
        _ => 10,
    }
}

/// Map a named background class to its concrete color, `None` for anything
/// outside the supported set.
#[must_use]
pub fn bg_class_color(class: &str) -> Option<&'static str> {
    match class {
        "bg-blue-500" => Some("#3b82f6"),
        "bg-blue-600" => Some("#2563eb"),
        "bg-slate-900" => Some("#0f172a"),
        "bg-slate-800" => Some("#1f2937"),
        _ => None,
    }
}

/// Whether a resolved panel background counts as a dark theme.
///
/// Membership in a closed set of two values; see the module docs for why
/// this is not a luminance check.
#[must_use]
pub fn is_dark_background(color: &str) -> bool {
    DARK_BACKGROUNDS.contains(&color)
}

/// Shift each RGB channel of a hex color by `amount`, clamped to `[0, 255]`.
///
/// Accepts `#rgb` and `#rrggbb`; anything else is returned unchanged.
#[must_use]
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
pub fn shift_hex(hex: &str, amount: i32) -> String {
    let Some((r, g, b)) = parse_hex(hex) else {
        return hex.to_owned();
    };
    let shift = |channel: u8| (i32::from(channel) + amount).clamp(0, 255) as u32;
    format!("#{:02x}{:02x}{:02x}", shift(r), shift(g), shift(b))
}

#[allow(clippy::cast_possible_truncation)]
fn parse_hex(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.strip_prefix('#')?;
    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 => digits.to_owned(),
        _ => return None,
    };
    let value = u32::from_str_radix(&expanded, 16).ok()?;
    Some((
        ((value >> 16) & 0xff) as u8,
        ((value >> 8) & 0xff) as u8,
        (value & 0xff) as u8,
    ))
}

/// A rendered widget stylesheet, attached to the host surface under a fixed
/// id so re-rendering replaces rather than duplicates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleSheet {
    pub id: &'static str,
    pub css: String,
}

/// Holds the single installed stylesheet for an activation.
#[derive(Debug, Default)]
pub struct StyleRegistry {
    installed: Option<StyleSheet>,
}

impl StyleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a sheet, replacing any previous one with the same id.
    pub fn install(&mut self, sheet: StyleSheet) {
        self.installed = Some(sheet);
    }

    /// The currently installed sheet, if any.
    #[must_use]
    pub fn current(&self) -> Option<&StyleSheet> {
        self.installed.as_ref()
    }
}

/// Build the widget stylesheet from a settings snapshot (or defaults).
#[must_use]
pub fn build_stylesheet(settings: Option<&Settings>) -> StyleSheet {
    let theme_color = pick(settings, |s| s.theme_color_hex.as_deref(), DEFAULT_THEME_COLOR);
    let theme_text = pick(settings, |s| s.theme_text_color_hex.as_deref(), DEFAULT_THEME_TEXT);
    let user_bg = pick(settings, |s| s.user_bubble_color.as_deref(), DEFAULT_USER_BUBBLE);
    let panel_bg = settings
        .and_then(|s| s.chat_bg_color.as_deref())
        .and_then(bg_class_color)
        .unwrap_or(DEFAULT_PANEL_BG);

    let dark = is_dark_background(panel_bg);
    let (title_color, subtitle_color, border_color, bot_bg_default, bot_text) = if dark {
        ("#f8fafc", "#94a3b8", "rgba(148,163,184,0.2)", "#1e293b", "#f1f5f9")
    } else {
        ("#0f172a", "#64748b", "#f3f4f6", "#f1f5f9", "#0f172a")
    };
    let bot_bg = pick(settings, |s| s.bot_bubble_color.as_deref(), bot_bg_default);

    let gradient_end = shift_hex(theme_color, GRADIENT_SHIFT);
    let font_size = font_size_px(settings.and_then(|s| s.font_size.as_deref()));
    let panel_radius = panel_radius_px(settings.and_then(|s| s.corner_radius.as_deref()));
    let bubble_radius = bubble_radius_px(settings.and_then(|s| s.corner_radius.as_deref()));

    let p = CLASS_PREFIX;
    let css = format!(
        r".{p}container {{ position: fixed; left: 20px; bottom: 40px; z-index: 999999; font-family: Inter, ui-sans-serif, system-ui, sans-serif; }}
.{p}button {{ width: 64px; height: 64px; border-radius: 999px; background: linear-gradient(135deg, {theme_color}, {gradient_end}); color: {theme_text}; border: none; cursor: pointer; }}
.{p}badge {{ position: absolute; right: -6px; top: -6px; background: #ef4444; color: #fff; min-width: 18px; height: 18px; border-radius: 999px; font-size: 12px; }}
.{p}panel {{ position: fixed; left: 20px; bottom: 120px; width: 360px; height: 560px; background: {panel_bg}; border-radius: {panel_radius}px; overflow: hidden; display: flex; flex-direction: column; }}
.{p}header {{ padding: 12px 14px; display: flex; align-items: center; gap: 10px; border-bottom: 1px solid {border_color}; }}
.{p}title {{ font-weight: 600; font-size: {font_size}px; color: {title_color}; }}
.{p}subtitle {{ font-size: 12px; color: {subtitle_color}; }}
.{p}messages {{ padding: 12px; overflow: auto; display: flex; flex-direction: column; gap: 10px; flex: 1; }}
.{p}bubble {{ max-width: 78%; padding: 10px 12px; border-radius: {bubble_radius}px; line-height: 1.3; font-size: {font_size}px; }}
.{p}bot {{ align-self: flex-start; background: {bot_bg}; color: {bot_text}; border-bottom-left-radius: 4px; }}
.{p}user {{ align-self: flex-end; background: {user_bg}; color: {theme_text}; border-bottom-right-radius: 4px; }}
.{p}inputArea {{ padding: 10px; border-top: 1px solid {border_color}; display: flex; gap: 8px; }}
.{p}textarea {{ flex: 1; min-height: 44px; padding: 10px 12px; border-radius: 10px; border: 1px solid {border_color}; font-size: {font_size}px; }}
.{p}send {{ background: linear-gradient(135deg, #06b6d4, #3b82f6); color: #fff; border: none; padding: 10px 12px; border-radius: 10px; cursor: pointer; }}
.{p}typing span {{ display: inline-block; width: 8px; height: 8px; background: #cbd5e1; border-radius: 999px; animation: {p}blink 1s infinite; }}
.{p}preform input {{ width: 100%; padding: 8px 10px; border: 1px solid {border_color}; border-radius: 8px; }}
@keyframes {p}blink {{ 0% {{ opacity: .15 }} 50% {{ opacity: 1 }} 100% {{ opacity: .15 }} }}
"
    );

    StyleSheet { id: STYLE_ID, css }
}

fn pick<'a>(
    settings: Option<&'a Settings>,
    field: fn(&'a Settings) -> Option<&'a str>,
    default: &'a str,
) -> &'a str {
    settings.and_then(field).unwrap_or(default)
}

#[cfg(test)]
#[path = "theme_test.rs"]
mod tests;
