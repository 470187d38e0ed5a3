use std::io::Write;

use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde_json::Value;

use crate::error::ExportError;
use crate::types::Issue;

/// Column header for the export: the keys of the first record, in document order.
///
/// Later records are projected onto this header. Keys they add are dropped and
/// keys they lack become empty cells.
pub fn header(issues: &[Issue]) -> Option<Vec<&str>> {
    issues
        .first()
        .map(|first| first.keys().map(String::as_str).collect())
}

/// Streams header plus one row per issue into `sink` and hands the sink back.
/// Returns `Ok(None)` without writing anything when there are no issues.
pub fn write_csv<W: Write>(issues: &[Issue], sink: W) -> Result<Option<W>, ExportError> {
    let Some(columns) = header(issues) else {
        return Ok(None);
    };

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::CRLF)
        .from_writer(sink);

    writer.write_record(&columns)?;
    for issue in issues {
        writer.write_record(columns.iter().map(|column| cell(issue.get(*column))))?;
    }

    let sink = writer
        .into_inner()
        .map_err(|err| ExportError::Flush(err.to_string()))?;
    Ok(Some(sink))
}

/// Renders the whole export into memory.
pub fn render_csv(issues: &[Issue]) -> Result<Option<Vec<u8>>, ExportError> {
    write_csv(issues, Vec::new())
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Bool(flag)) => flag.to_string(),
        Some(Value::Number(number)) => number.to_string(),
        // nested structures are written as compact JSON
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::enrich::UploadMetadata;
    use crate::types::TriggerEvent;
    use serde_json::json;

    fn issues(value: Value) -> Vec<Issue> {
        serde_json::from_value(value).unwrap()
    }

    fn render(records: &[Issue]) -> String {
        String::from_utf8(render_csv(records).unwrap().unwrap()).unwrap()
    }

    #[test]
    fn header_comes_from_first_record() {
        let mut records = issues(json!([{"a": 1, "b": 2}, {"a": 3, "c": 4}]));
        UploadMetadata::from_event(&TriggerEvent::new("scans", "scan.json", "T")).apply(&mut records);

        assert_eq!(
            render(&records),
            "a,b,file_upload_time,source_file\r\n1,2,T,scan.json\r\n3,,T,scan.json\r\n"
        );
    }

    #[test]
    fn empty_input_writes_nothing() {
        assert!(render_csv(&[]).unwrap().is_none());
        assert!(header(&[]).is_none());
    }

    #[test]
    fn quotes_only_when_needed() {
        let records = issues(json!([
            {"title": "plain", "detail": "a, b"},
            {"title": "say \"hi\"", "detail": "line1\nline2"}
        ]));

        assert_eq!(
            render(&records),
            "title,detail\r\nplain,\"a, b\"\r\n\"say \"\"hi\"\"\",\"line1\nline2\"\r\n"
        );
    }

    #[test]
    fn scalars_and_structures_render_as_text() {
        let records = issues(json!([
            {"n": 1.5, "ok": true, "none": null, "tags": ["x", "y"]}
        ]));

        assert_eq!(
            render(&records),
            "n,ok,none,tags\r\n1.5,true,,\"[\"\"x\"\",\"\"y\"\"]\"\r\n"
        );
    }

    #[test]
    fn output_is_deterministic() {
        let records = issues(json!([
            {"z": 1, "a": 2, "m": "x"},
            {"m": "y", "a": 3}
        ]));

        let first = render_csv(&records).unwrap();
        let second = render_csv(&records).unwrap();
        assert_eq!(first, second);
        assert!(render(&records).starts_with("z,a,m\r\n"));
    }

    #[test]
    fn streams_into_any_writer() {
        let records = issues(json!([{"a": 1}]));
        let mut sink = std::io::Cursor::new(Vec::new());
        write_csv(&records, &mut sink).unwrap();
        assert_eq!(sink.into_inner(), b"a\r\n1\r\n".to_vec());
    }
}
