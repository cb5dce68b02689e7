use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ProjectionError;

/// Coarse verbosity class used for colouring the level column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelBucket {
    Debug,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Two-stop vertical gradient painted behind a level cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gradient {
    pub start: Rgb,
    pub end: Rgb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketStyle {
    pub label: &'static str,
    pub icon: &'static str,
    pub color_a: Rgb,
    pub color_b: Rgb,
}

impl BucketStyle {
    pub fn gradient(&self) -> Gradient {
        Gradient {
            start: self.color_a,
            end: self.color_b,
        }
    }
}

const STYLES: [BucketStyle; 4] = [
    BucketStyle {
        label: "Debug",
        icon: "debug_thumb.png",
        color_a: Rgb(100, 200, 100),
        color_b: Rgb(150, 200, 150),
    },
    BucketStyle {
        label: "Info",
        icon: "info_thumb.png",
        color_a: Rgb(100, 100, 250),
        color_b: Rgb(150, 150, 250),
    },
    BucketStyle {
        label: "Warning",
        icon: "warning_thumb.png",
        color_a: Rgb(200, 200, 100),
        color_b: Rgb(200, 200, 150),
    },
    BucketStyle {
        label: "Error",
        icon: "error_thumb.png",
        color_a: Rgb(200, 100, 100),
        color_b: Rgb(200, 150, 150),
    },
];

impl LevelBucket {
    pub const ALL: [LevelBucket; 4] = [
        LevelBucket::Debug,
        LevelBucket::Info,
        LevelBucket::Warning,
        LevelBucket::Error,
    ];

    /// Representative numeric level; also the value written when an operator
    /// picks this bucket.
    pub fn code(self) -> i32 {
        match self {
            LevelBucket::Debug => 10,
            LevelBucket::Info => 20,
            LevelBucket::Warning => 30,
            LevelBucket::Error => 40,
        }
    }

    pub fn style(self) -> &'static BucketStyle {
        &STYLES[self as usize]
    }

    pub fn label(self) -> &'static str {
        self.style().label
    }
}

impl fmt::Display for LevelBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LevelBucket {
    type Err = ProjectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "debug" => Ok(LevelBucket::Debug),
            "info" => Ok(LevelBucket::Info),
            "warn" | "warning" => Ok(LevelBucket::Warning),
            "error" => Ok(LevelBucket::Error),
            _ => Err(ProjectionError::UnknownBucket(s.to_string())),
        }
    }
}

/// Classify any level. Everything at or below 10 (negatives included) is Debug,
/// everything above 30 is Error.
pub fn bucket_of(level: i32) -> LevelBucket {
    match level {
        i32::MIN..=10 => LevelBucket::Debug,
        11..=20 => LevelBucket::Info,
        21..=30 => LevelBucket::Warning,
        _ => LevelBucket::Error,
    }
}

/// The selectable levels offered by the level picker, lowest first.
pub fn level_choices() -> [LevelBucket; 4] {
    LevelBucket::ALL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_boundaries() {
        let cases = [
            (0, LevelBucket::Debug),
            (10, LevelBucket::Debug),
            (11, LevelBucket::Info),
            (20, LevelBucket::Info),
            (21, LevelBucket::Warning),
            (30, LevelBucket::Warning),
            (31, LevelBucket::Error),
            (50, LevelBucket::Error),
        ];
        for (level, expected) in cases {
            assert_eq!(bucket_of(level), expected, "level {level}");
        }
    }

    #[test]
    fn test_bucket_extremes() {
        assert_eq!(bucket_of(i32::MIN), LevelBucket::Debug);
        assert_eq!(bucket_of(-1), LevelBucket::Debug);
        assert_eq!(bucket_of(i32::MAX), LevelBucket::Error);
    }

    #[test]
    fn test_codes_land_in_their_own_bucket() {
        for bucket in LevelBucket::ALL {
            assert_eq!(bucket_of(bucket.code()), bucket);
        }
    }

    #[test]
    fn test_styles() {
        assert_eq!(LevelBucket::Debug.label(), "Debug");
        assert_eq!(LevelBucket::Error.style().color_a, Rgb(200, 100, 100));
        assert_eq!(
            LevelBucket::Info.style().gradient(),
            Gradient {
                start: Rgb(100, 100, 250),
                end: Rgb(150, 150, 250),
            }
        );
    }

    #[test]
    fn test_level_choices_ascending() {
        let codes: Vec<i32> = level_choices().iter().map(|b| b.code()).collect();
        assert_eq!(codes, vec![10, 20, 30, 40]);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("WARN".parse::<LevelBucket>().unwrap(), LevelBucket::Warning);
        assert_eq!("info".parse::<LevelBucket>().unwrap(), LevelBucket::Info);
        assert!("loud".parse::<LevelBucket>().is_err());
    }
}
