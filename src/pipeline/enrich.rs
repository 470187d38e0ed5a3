use serde_json::Value;

use crate::constants::{FILE_UPLOAD_TIME_FIELD, SOURCE_FILE_FIELD};
use crate::types::{Issue, TriggerEvent};

/// Upload metadata stamped onto every issue before it reaches either sink
#[derive(Debug, Clone)]
pub struct UploadMetadata {
    pub file_upload_time: String,
    pub source_file: String,
}

impl UploadMetadata {
    pub fn from_event(event: &TriggerEvent) -> Self {
        Self {
            file_upload_time: event.time_created.clone(),
            source_file: event.name.clone(),
        }
    }

    /// Insert-or-overwrite both fields on every record. Existing keys keep their
    /// position, new keys are appended after the record's own fields.
    pub fn apply(&self, issues: &mut [Issue]) {
        for issue in issues.iter_mut() {
            issue.insert(
                FILE_UPLOAD_TIME_FIELD.to_string(),
                Value::String(self.file_upload_time.clone()),
            );
            issue.insert(
                SOURCE_FILE_FIELD.to_string(),
                Value::String(self.source_file.clone()),
            );
        }
    }
}
