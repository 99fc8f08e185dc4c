//! Conversion of ANSI-coloured process output to inline-styled HTML

use std::sync::OnceLock;

use regex::Regex;

const PALETTE: [(u8, u8, u8); 8] = [
    (0, 0, 0),
    (187, 0, 0),
    (0, 187, 0),
    (187, 187, 0),
    (0, 0, 187),
    (187, 0, 187),
    (0, 187, 187),
    (255, 255, 255),
];

const BRIGHT_PALETTE: [(u8, u8, u8); 8] = [
    (85, 85, 85),
    (255, 85, 85),
    (0, 255, 0),
    (255, 255, 85),
    (85, 85, 255),
    (255, 85, 255),
    (85, 255, 255),
    (255, 255, 255),
];

const CUBE_LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];

fn csi_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\x1b\[([0-9;?]*)([@-~])").expect("CSI pattern is valid"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rgb(u8, u8, u8);

impl From<(u8, u8, u8)> for Rgb {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Rgb(r, g, b)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Style {
    fg: Option<Rgb>,
    bg: Option<Rgb>,
    bold: bool,
    faint: bool,
    italic: bool,
    underline: bool,
}

impl Style {
    fn css(&self) -> String {
        let mut parts = Vec::new();
        if let Some(Rgb(r, g, b)) = self.fg {
            parts.push(format!("color:rgb({},{},{})", r, g, b));
        }
        if let Some(Rgb(r, g, b)) = self.bg {
            parts.push(format!("background-color:rgb({},{},{})", r, g, b));
        }
        if self.bold {
            parts.push("font-weight:bold".to_string());
        }
        if self.faint {
            parts.push("opacity:0.7".to_string());
        }
        if self.italic {
            parts.push("font-style:italic".to_string());
        }
        if self.underline {
            parts.push("text-decoration:underline".to_string());
        }
        parts.join(";")
    }

    fn apply(&mut self, params: &str) {
        let codes: Vec<u16> = if params.is_empty() {
            vec![0]
        } else {
            params
                .split(';')
                .map(|p| p.parse::<u16>().unwrap_or(0))
                .collect()
        };

        let mut i = 0;
        while i < codes.len() {
            match codes[i] {
                0 => *self = Style::default(),
                1 => self.bold = true,
                2 => self.faint = true,
                3 => self.italic = true,
                4 => self.underline = true,
                22 => {
                    self.bold = false;
                    self.faint = false;
                }
                23 => self.italic = false,
                24 => self.underline = false,
                c @ 30..=37 => self.fg = Some(PALETTE[(c - 30) as usize].into()),
                39 => self.fg = None,
                c @ 40..=47 => self.bg = Some(PALETTE[(c - 40) as usize].into()),
                49 => self.bg = None,
                c @ 90..=97 => self.fg = Some(BRIGHT_PALETTE[(c - 90) as usize].into()),
                c @ 100..=107 => self.bg = Some(BRIGHT_PALETTE[(c - 100) as usize].into()),
                c @ (38 | 48) => {
                    let (color, consumed) = extended_color(&codes[i + 1..]);
                    if let Some(color) = color {
                        if c == 38 {
                            self.fg = Some(color);
                        } else {
                            self.bg = Some(color);
                        }
                    }
                    i += consumed;
                }
                _ => {}
            }
            i += 1;
        }
    }
}

/// Parse the arguments following a 38/48 code, returning the colour and how
/// many codes were consumed
fn extended_color(rest: &[u16]) -> (Option<Rgb>, usize) {
    match rest {
        [5, n, ..] => (indexed_color(*n), 2),
        [2, r, g, b, ..] => (
            Some(Rgb(clamp_channel(*r), clamp_channel(*g), clamp_channel(*b))),
            4,
        ),
        [5] => (None, 1),
        [2, ..] => (None, rest.len()),
        _ => (None, 0),
    }
}

fn clamp_channel(value: u16) -> u8 {
    value.min(255) as u8
}

fn indexed_color(n: u16) -> Option<Rgb> {
    match n {
        0..=7 => Some(PALETTE[n as usize].into()),
        8..=15 => Some(BRIGHT_PALETTE[(n - 8) as usize].into()),
        16..=231 => {
            let n = n - 16;
            let r = CUBE_LEVELS[(n / 36) as usize];
            let g = CUBE_LEVELS[((n / 6) % 6) as usize];
            let b = CUBE_LEVELS[(n % 6) as usize];
            Some(Rgb(r, g, b))
        }
        232..=255 => {
            let level = (8 + (n - 232) * 10) as u8;
            Some(Rgb(level, level, level))
        }
        _ => None,
    }
}

/// Escape text for inclusion in HTML
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

/// Stateful converter; a style left open by one chunk carries into the next
#[derive(Debug, Clone, Default)]
pub struct AnsiConverter {
    style: Style,
}

impl AnsiConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert a chunk of output to HTML
    pub fn to_html(&mut self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;

        for caps in csi_pattern().captures_iter(text) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            self.push_run(&mut out, &text[last..whole.start()]);
            if caps.get(2).map(|m| m.as_str()) == Some("m") {
                let params = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                self.style.apply(params);
            }
            last = whole.end();
        }
        self.push_run(&mut out, &text[last..]);
        out
    }

    fn push_run(&self, out: &mut String, run: &str) {
        let run: String = run.chars().filter(|c| *c != '\u{1b}').collect();
        if run.is_empty() {
            return;
        }
        let escaped = escape_html(&run);
        if self.style == Style::default() {
            out.push_str(&escaped);
        } else {
            out.push_str(&format!(
                "<span style=\"{}\">{}</span>",
                self.style.css(),
                escaped
            ));
        }
    }
}

/// Convert a single chunk with a fresh converter
pub fn ansi_to_html(text: &str) -> String {
    AnsiConverter::new().to_html(text)
}
