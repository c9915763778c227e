use crate::hierarchy::HierarchyError;

pub(crate) const TITLE_MAX_CHARS: usize = 50;
pub(crate) const TASK_TITLE_MAX_CHARS: usize = 100;
pub(crate) const ICON_MAX_CHARS: usize = 10;

/// Trims `raw` and checks it is non-empty and at most `max_chars` characters.
pub(crate) fn required_text(
    field: &'static str,
    raw: &str,
    max_chars: usize,
) -> Result<String, HierarchyError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(HierarchyError::validation(field, "must not be empty"));
    }
    if trimmed.chars().count() > max_chars {
        return Err(HierarchyError::validation(
            field,
            format!("must be at most {max_chars} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

/// Blank descriptions are stored as NULL.
pub(crate) fn optional_text(raw: Option<&String>) -> Option<String> {
    raw.map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

pub(crate) fn order_index(value: i32) -> Result<i32, HierarchyError> {
    if value < 0 {
        return Err(HierarchyError::validation(
            "order_index",
            "must be zero or greater",
        ));
    }
    Ok(value)
}
