use super::RegistryError;

pub const NOTSET: i32 = 0;
pub const DEBUG: i32 = 10;
pub const INFO: i32 = 20;
pub const WARNING: i32 = 30;
pub const ERROR: i32 = 40;
pub const CRITICAL: i32 = 50;

const NAMED_LEVELS: [(&str, i32); 6] = [
    ("notset", NOTSET),
    ("debug", DEBUG),
    ("info", INFO),
    ("warning", WARNING),
    ("error", ERROR),
    ("critical", CRITICAL),
];

/// Human readable name for a numeric level, `"Level N"` when it is not one of the
/// well-known values.
pub fn level_name(level: i32) -> String {
    NAMED_LEVELS
        .iter()
        .find(|(_, value)| *value == level)
        .map(|(name, _)| name.to_uppercase())
        .unwrap_or_else(|| format!("Level {level}"))
}

/// Parse a level given either as a name (case-insensitive) or as an integer.
pub fn parse_level(input: &str) -> Result<i32, RegistryError> {
    let trimmed = input.trim();
    if let Ok(value) = trimmed.parse::<i32>() {
        return Ok(value);
    }

    let lowered = trimmed.to_lowercase();
    let lookup = match lowered.as_str() {
        "warn" => "warning",
        "fatal" => "critical",
        other => other,
    };

    NAMED_LEVELS
        .iter()
        .find(|(name, _)| *name == lookup)
        .map(|(_, value)| *value)
        .ok_or_else(|| RegistryError::InvalidLogLevel {
            input: input.to_string(),
            valid_levels: NAMED_LEVELS.iter().map(|(name, _)| name.to_string()).collect(),
        })
}
