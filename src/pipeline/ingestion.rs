use serde_json::Value;

use crate::constants::ISSUES_FIELD;
use crate::error::IngestionError;
use crate::types::Issue;

/// Decodes raw object bytes into the ordered issue records of a scan document.
///
/// A missing `issues` key yields an empty list. Anything else that does not look
/// like `{"issues": [{...}, ...]}` is an error.
pub fn decode_issues(bytes: Vec<u8>) -> Result<Vec<Issue>, IngestionError> {
    let text = String::from_utf8(bytes)?;
    let document: Value = serde_json::from_str(&text)?;

    let Value::Object(mut root) = document else {
        return Err(IngestionError::NotAnObject);
    };

    let items = match root.remove(ISSUES_FIELD) {
        None => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(IngestionError::IssuesNotArray),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(issue) => Ok(issue),
            _ => Err(IngestionError::IssueNotObject(index)),
        })
        .collect()
}
