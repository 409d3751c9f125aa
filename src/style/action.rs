//! Line-oriented action grammar.
//!
//! Each line reads `<kind> <param>,<param>,...`. The first whitespace-separated token names the
//! kind, every remaining character except whitespace is the comma-separated parameter list, and
//! empty parameters are dropped. Validation is driven by [`ActionKind::contract`], a closed table
//! of arity and per-slot type rules.

use std::fmt;

use crate::foundation::core::HexColor;
use crate::foundation::error::{InvalidActions, StyleCacheError, StyleCacheResult};

/// Closed set of transformation primitives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionKind {
    Flip,
    Rotate,
    Brightness,
    Contrast,
    Smooth,
    Fill,
    Colorize,
    Crop,
    Overlay,
    Text,
    FitToWidth,
    FitToHeight,
    Pixelate,
    Opacity,
    Resize,
    Thumbnail,
    BestFit,
    AutoOrient,
    Desaturate,
    Invert,
    Edges,
    Emboss,
    MeanRemove,
    Blur,
    Sketch,
    Sepia,
}

/// How many parameters a kind accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

/// Type rule for one parameter position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Slot {
    /// Finite number within `[min, max]`.
    Number { min: f64, max: f64 },
    /// `#RGB` or `#RRGGBB`.
    Color,
    /// `x` or `y`.
    Axis,
    /// Free-form token (file names, text, anchors).
    Any,
}

const NUM: Slot = Slot::Number {
    min: f64::NEG_INFINITY,
    max: f64::INFINITY,
};

const DEGREES: Slot = Slot::Number {
    min: 0.0,
    max: 360.0,
};
const LEVEL_255: Slot = Slot::Number {
    min: -255.0,
    max: 255.0,
};
const LEVEL_100: Slot = Slot::Number {
    min: -100.0,
    max: 100.0,
};
const LEVEL_10: Slot = Slot::Number {
    min: -10.0,
    max: 10.0,
};

/// Parameter contract of one [`ActionKind`].
///
/// `slots` types the leading parameters; positions past the end of `slots` are [`Slot::Any`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Contract {
    pub arity: Arity,
    pub slots: &'static [Slot],
}

const fn contract(arity: Arity, slots: &'static [Slot]) -> Contract {
    Contract { arity, slots }
}

impl ActionKind {
    pub const ALL: [ActionKind; 26] = [
        Self::Flip,
        Self::Rotate,
        Self::Brightness,
        Self::Contrast,
        Self::Smooth,
        Self::Fill,
        Self::Colorize,
        Self::Crop,
        Self::Overlay,
        Self::Text,
        Self::FitToWidth,
        Self::FitToHeight,
        Self::Pixelate,
        Self::Opacity,
        Self::Resize,
        Self::Thumbnail,
        Self::BestFit,
        Self::AutoOrient,
        Self::Desaturate,
        Self::Invert,
        Self::Edges,
        Self::Emboss,
        Self::MeanRemove,
        Self::Blur,
        Self::Sketch,
        Self::Sepia,
    ];

    /// Resolve a kind token. Accepts snake_case, kebab-case and a few descriptive aliases.
    pub fn parse(token: &str) -> Option<Self> {
        let kind = token.trim().to_ascii_lowercase().replace('-', "_");
        let kind = match kind.as_str() {
            "flip" => Self::Flip,
            "rotate" => Self::Rotate,
            "brightness" => Self::Brightness,
            "contrast" => Self::Contrast,
            "smooth" => Self::Smooth,
            "fill" => Self::Fill,
            "colorize" => Self::Colorize,
            "crop" => Self::Crop,
            "overlay" => Self::Overlay,
            "text" => Self::Text,
            "fit_to_width" => Self::FitToWidth,
            "fit_to_height" => Self::FitToHeight,
            "pixelate" => Self::Pixelate,
            "opacity" => Self::Opacity,
            "resize" => Self::Resize,
            "thumbnail" => Self::Thumbnail,
            "best_fit" => Self::BestFit,
            "auto_orient" => Self::AutoOrient,
            "desaturate" => Self::Desaturate,
            "invert" => Self::Invert,
            "edges" | "edge_detect" => Self::Edges,
            "emboss" => Self::Emboss,
            "mean_remove" => Self::MeanRemove,
            "blur" => Self::Blur,
            "sketch" => Self::Sketch,
            "sepia" => Self::Sepia,
            _ => return None,
        };
        Some(kind)
    }

    /// Canonical token, as written back into action text.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flip => "flip",
            Self::Rotate => "rotate",
            Self::Brightness => "brightness",
            Self::Contrast => "contrast",
            Self::Smooth => "smooth",
            Self::Fill => "fill",
            Self::Colorize => "colorize",
            Self::Crop => "crop",
            Self::Overlay => "overlay",
            Self::Text => "text",
            Self::FitToWidth => "fit_to_width",
            Self::FitToHeight => "fit_to_height",
            Self::Pixelate => "pixelate",
            Self::Opacity => "opacity",
            Self::Resize => "resize",
            Self::Thumbnail => "thumbnail",
            Self::BestFit => "best_fit",
            Self::AutoOrient => "auto_orient",
            Self::Desaturate => "desaturate",
            Self::Invert => "invert",
            Self::Edges => "edges",
            Self::Emboss => "emboss",
            Self::MeanRemove => "mean_remove",
            Self::Blur => "blur",
            Self::Sketch => "sketch",
            Self::Sepia => "sepia",
        }
    }

    pub fn contract(self) -> Contract {
        use Arity::{AtLeast, Exact};
        match self {
            Self::Flip => contract(Exact(1), &[Slot::Axis]),
            Self::Rotate => contract(Exact(1), &[DEGREES]),
            Self::Brightness => contract(Exact(1), &[LEVEL_255]),
            Self::Contrast => contract(Exact(1), &[LEVEL_100]),
            Self::Smooth => contract(Exact(1), &[LEVEL_10]),
            Self::Fill => contract(Exact(1), &[Slot::Color]),
            Self::Colorize => contract(Exact(2), &[Slot::Color, NUM]),
            Self::Crop => contract(AtLeast(4), &[NUM, NUM, NUM, NUM]),
            Self::Overlay => contract(Exact(5), &[Slot::Any, Slot::Any, NUM, NUM, NUM]),
            Self::Text => contract(
                Exact(7),
                &[Slot::Any, Slot::Any, NUM, Slot::Color, Slot::Any, NUM, NUM],
            ),
            Self::FitToWidth | Self::FitToHeight | Self::Pixelate | Self::Opacity => {
                contract(Exact(1), &[NUM])
            }
            Self::Resize | Self::Thumbnail | Self::BestFit => contract(AtLeast(2), &[NUM, NUM]),
            Self::AutoOrient
            | Self::Desaturate
            | Self::Invert
            | Self::Edges
            | Self::Emboss
            | Self::MeanRemove
            | Self::Blur
            | Self::Sketch
            | Self::Sepia => contract(Exact(0), &[]),
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
}

/// A validated parameter value.
#[derive(Clone, Debug, PartialEq)]
pub enum Param {
    Number(f64),
    Color(HexColor),
    Axis(Axis),
    Token(String),
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Color(c) => write!(f, "{c}"),
            Self::Axis(Axis::X) => f.write_str("x"),
            Self::Axis(Axis::Y) => f.write_str("y"),
            Self::Token(t) => f.write_str(t),
        }
    }
}

/// One validated transformation step.
#[derive(Clone, Debug, PartialEq)]
pub struct Action {
    pub kind: ActionKind,
    pub params: Vec<Param>,
    /// Position in the owning style's chain (the 0-based source line index).
    pub order: usize,
}

impl Action {
    /// Parse and validate a single action line.
    pub fn parse(line: &str, order: usize) -> Result<Self, String> {
        let line = line.trim();
        let (kind_token, rest) = match line.split_once(char::is_whitespace) {
            Some((k, r)) => (k, r),
            None => (line, ""),
        };
        let kind =
            ActionKind::parse(kind_token).ok_or_else(|| format!("unknown action '{kind_token}'"))?;

        let joined: String = rest.chars().filter(|c| !c.is_whitespace()).collect();
        let raw: Vec<&str> = joined.split(',').filter(|t| !t.is_empty()).collect();

        let contract = kind.contract();
        let arity_ok = match contract.arity {
            Arity::Exact(n) => raw.len() == n,
            Arity::AtLeast(n) => raw.len() >= n,
        };
        if !arity_ok {
            return Err(match contract.arity {
                Arity::Exact(n) => format!("{kind} expects {n} parameter(s), got {}", raw.len()),
                Arity::AtLeast(n) => {
                    format!("{kind} expects at least {n} parameter(s), got {}", raw.len())
                }
            });
        }

        let params = raw
            .iter()
            .enumerate()
            .map(|(i, token)| {
                let slot = contract.slots.get(i).copied().unwrap_or(Slot::Any);
                check_slot(slot, token).map_err(|e| format!("{kind} parameter {}: {e}", i + 1))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            kind,
            params,
            order,
        })
    }

    pub fn number(&self, idx: usize) -> Option<f64> {
        match self.params.get(idx) {
            Some(Param::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn color(&self, idx: usize) -> Option<HexColor> {
        match self.params.get(idx) {
            Some(Param::Color(c)) => Some(*c),
            _ => None,
        }
    }

    pub fn axis(&self, idx: usize) -> Option<Axis> {
        match self.params.get(idx) {
            Some(Param::Axis(a)) => Some(*a),
            _ => None,
        }
    }

    /// Raw text of any parameter, typed or not.
    pub fn token(&self, idx: usize) -> Option<String> {
        self.params.get(idx).map(ToString::to_string)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.as_str())?;
        if !self.params.is_empty() {
            let params = self
                .params
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            write!(f, " {params}")?;
        }
        Ok(())
    }
}

fn check_slot(slot: Slot, token: &str) -> Result<Param, String> {
    match slot {
        Slot::Number { min, max } => {
            let n = parse_number(token).ok_or_else(|| format!("'{token}' is not a number"))?;
            if n < min || n > max {
                return Err(format!("{n} is outside {min}..={max}"));
            }
            Ok(Param::Number(n))
        }
        Slot::Color => HexColor::parse(token)
            .map(Param::Color)
            .ok_or_else(|| format!("'{token}' is not a #RGB or #RRGGBB color")),
        Slot::Axis => match token {
            "x" => Ok(Param::Axis(Axis::X)),
            "y" => Ok(Param::Axis(Axis::Y)),
            _ => Err(format!("'{token}' must be x or y")),
        },
        Slot::Any => Ok(Param::Token(token.to_string())),
    }
}

fn parse_number(token: &str) -> Option<f64> {
    // Rust's float grammar also admits "inf"/"nan", which are not numbers here.
    if !token
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'))
    {
        return None;
    }
    token.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Validate an ordered list of action lines as one all-or-nothing batch.
///
/// Blank lines are skipped but still count toward line numbering. On failure every bad line is
/// reported (1-based) and no actions are returned.
pub fn parse_and_validate<S: AsRef<str>>(lines: &[S]) -> StyleCacheResult<Vec<Action>> {
    let mut actions = Vec::with_capacity(lines.len());
    let mut invalid = InvalidActions::default();

    for (idx, line) in lines.iter().enumerate() {
        let line = line.as_ref();
        if line.trim().is_empty() {
            continue;
        }
        match Action::parse(line, idx) {
            Ok(action) => actions.push(action),
            Err(reason) => invalid.push(idx + 1, reason),
        }
    }

    if !invalid.is_empty() {
        return Err(StyleCacheError::InvalidActions(invalid));
    }
    if actions.is_empty() {
        return Err(StyleCacheError::validation(
            "at least one action is required",
        ));
    }
    Ok(actions)
}

/// [`parse_and_validate`] over newline-separated text.
pub fn parse_action_text(text: &str) -> StyleCacheResult<Vec<Action>> {
    let lines: Vec<&str> = text.lines().collect();
    parse_and_validate(&lines)
}

#[cfg(test)]
#[path = "../../tests/unit/style/action.rs"]
mod tests;
