use iced::color;
use iced::theme::Palette;
use iced::{Color, Theme};

use crate::settings::Appearance;

pub fn resolve_theme(appearance: Appearance, high_contrast: bool) -> Theme {
    let dark = match appearance {
        Appearance::Dark => true,
        Appearance::Light => false,
        Appearance::System => system_prefers_dark(),
    };

    let palette = match (dark, high_contrast) {
        (true, false) => Palette {
            background: color!(0x18, 0x1a, 0x1d),
            text: color!(0xd6, 0xd8, 0xdb),
            primary: color!(0x3d, 0xb8, 0x6b),
            success: color!(0x30, 0xd1, 0x58),
            warning: color!(0xff, 0xcc, 0x00),
            danger: color!(0xff, 0x5a, 0x4f),
        },
        (false, false) => Palette {
            background: color!(0xf4, 0xf5, 0xf6),
            text: color!(0x1d, 0x1f, 0x22),
            primary: color!(0x1f, 0x9d, 0x55),
            success: color!(0x34, 0xc7, 0x59),
            warning: color!(0xd9, 0x8a, 0x00),
            danger: color!(0xe0, 0x35, 0x2b),
        },
        (true, true) => Palette {
            background: color!(0x00, 0x00, 0x00),
            text: color!(0xff, 0xff, 0xff),
            primary: color!(0x4d, 0xff, 0x88),
            success: color!(0x30, 0xd1, 0x58),
            warning: color!(0xff, 0xd6, 0x0a),
            danger: color!(0xff, 0x45, 0x3a),
        },
        (false, true) => Palette {
            background: color!(0xff, 0xff, 0xff),
            text: color!(0x00, 0x00, 0x00),
            primary: color!(0x00, 0x6b, 0x2c),
            success: color!(0x24, 0x8a, 0x3d),
            warning: color!(0xb2, 0x5c, 0x00),
            danger: color!(0xc0, 0x00, 0x12),
        },
    };

    Theme::custom("FaceCap", palette)
}

/// Background for the video well and the face cards.
pub fn surface_color(theme: &Theme) -> Color {
    let p = theme.palette();
    let luma = p.background.r * 0.299 + p.background.g * 0.587 + p.background.b * 0.114;
    let shift = if luma > 0.5 { -0.06 } else { 0.08 };
    Color {
        r: (p.background.r + shift).clamp(0.0, 1.0),
        g: (p.background.g + shift).clamp(0.0, 1.0),
        b: (p.background.b + shift).clamp(0.0, 1.0),
        a: 1.0,
    }
}

fn system_prefers_dark() -> bool {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("defaults")
            .args(["read", "-g", "AppleInterfaceStyle"])
            .output()
            .map(|o| {
                String::from_utf8_lossy(&o.stdout)
                    .trim()
                    .eq_ignore_ascii_case("dark")
            })
            .unwrap_or(true)
    }
    #[cfg(not(target_os = "macos"))]
    {
        true
    }
}
