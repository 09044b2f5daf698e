use color_eyre::eyre;
use color_eyre::Report;
use plotters::style::RGBColor;

pub const WIDTH: u32 = 800;
pub const HEIGHT: u32 = 600;
pub const FONT: &str = "sans-serif";
pub const TITLE_SIZE: u32 = 20;
pub const LABEL_SIZE: u32 = 15;

// colorblind-safe cycle
const DEFAULT_PALETTE: [&str; 8] = [
    "#0173b2", "#de8f05", "#029e73", "#d55e00", "#cc78bc", "#ca9161",
    "#fbafe4", "#949494",
];

/// The color cycle used for factor levels and hue groups. Indexing wraps
/// around, so any number of groups gets a color.
#[derive(Debug, Clone)]
pub struct Palette {
    colors: Vec<RGBColor>,
}

impl Default for Palette {
    fn default() -> Self {
        let colors = DEFAULT_PALETTE
            .iter()
            .map(|hex| parse_hex(hex).expect("default palette should parse"))
            .collect();
        Self { colors }
    }
}

impl Palette {
    pub fn from_hex(hex: &[String]) -> Result<Self, Report> {
        if hex.is_empty() {
            eyre::bail!("palette cannot be empty");
        }
        let colors = hex
            .iter()
            .map(|entry| parse_hex(entry))
            .collect::<Result<_, _>>()?;
        Ok(Self { colors })
    }

    pub fn color(&self, index: usize) -> RGBColor {
        self.colors[index % self.colors.len()]
    }
}

fn parse_hex(hex: &str) -> Result<RGBColor, Report> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 {
        eyre::bail!("bad palette entry {:?}: expected #rrggbb", hex);
    }
    let r = u8::from_str_radix(&digits[0..2], 16)?;
    let g = u8::from_str_radix(&digits[2..4], 16)?;
    let b = u8::from_str_radix(&digits[4..6], 16)?;
    Ok(RGBColor(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex() {
        assert_eq!(parse_hex("#0173b2").unwrap(), RGBColor(0x01, 0x73, 0xb2));
        assert_eq!(parse_hex("ffffff").unwrap(), RGBColor(255, 255, 255));
        assert!(parse_hex("#zzz").is_err());
    }

    #[test]
    fn palette_wraps() {
        let palette = Palette::default();
        assert_eq!(palette.color(0), palette.color(8));
    }
}
