// privacy-backend/src/features/export/services/serializer.rs

//! エクスポート文書 (JSON オブジェクト) を各フォーマットのバイト列に変換する

use crate::error::{AppError, AppResult};
use crate::features::export::models::ExportFormat;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde_json::Value;
use std::io::Cursor;

pub const CSV_HEADER: [&str; 4] = ["data_type", "record", "field", "value"];

pub fn serialize(document: &Value, format: ExportFormat) -> AppResult<Vec<u8>> {
    match format {
        ExportFormat::Json => to_json(document),
        ExportFormat::Csv => to_csv(document),
        ExportFormat::Xml => to_xml(document),
    }
}

pub fn to_json(document: &Value) -> AppResult<Vec<u8>> {
    serde_json::to_vec_pretty(document)
        .map_err(|e| AppError::InternalServerError(format!("Failed to serialize export: {}", e)))
}

/// 縦持ち CSV: 1 行 = 1 フィールド。ネストはドット区切りのパスで表す
pub fn to_csv(document: &Value) -> AppResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER).map_err(csv_error)?;

    for (data_type, records) in sections(document) {
        for (index, record) in records.iter().enumerate() {
            let record_index = index.to_string();
            for (field, value) in flatten(record) {
                writer
                    .write_record([data_type, record_index.as_str(), field.as_str(), value.as_str()])
                    .map_err(csv_error)?;
            }
        }
    }

    writer
        .into_inner()
        .map_err(|e| AppError::InternalServerError(format!("Failed to write CSV export: {}", e)))
}

pub fn to_xml(document: &Value) -> AppResult<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    write_event(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;
    write_event(&mut writer, Event::Start(BytesStart::new("export")))?;

    for (data_type, records) in sections(document) {
        let mut section = BytesStart::new("section");
        section.push_attribute(("name", data_type));
        write_event(&mut writer, Event::Start(section))?;

        for (index, record) in records.iter().enumerate() {
            let record_index = index.to_string();
            let mut element = BytesStart::new("record");
            element.push_attribute(("index", record_index.as_str()));
            write_event(&mut writer, Event::Start(element))?;

            for (field, value) in flatten(record) {
                let mut field_element = BytesStart::new("field");
                field_element.push_attribute(("name", field.as_str()));
                if value.is_empty() {
                    write_event(&mut writer, Event::Empty(field_element))?;
                } else {
                    write_event(&mut writer, Event::Start(field_element))?;
                    write_event(&mut writer, Event::Text(BytesText::new(&value)))?;
                    write_event(&mut writer, Event::End(BytesEnd::new("field")))?;
                }
            }

            write_event(&mut writer, Event::End(BytesEnd::new("record")))?;
        }

        write_event(&mut writer, Event::End(BytesEnd::new("section")))?;
    }

    write_event(&mut writer, Event::End(BytesEnd::new("export")))?;
    Ok(writer.into_inner().into_inner())
}

fn write_event(writer: &mut Writer<Cursor<Vec<u8>>>, event: Event<'_>) -> AppResult<()> {
    writer
        .write_event(event)
        .map_err(|e| AppError::InternalServerError(format!("Failed to write XML export: {}", e)))
}

fn csv_error(e: csv::Error) -> AppError {
    AppError::InternalServerError(format!("Failed to write CSV export: {}", e))
}

/// トップレベルのキーごとにレコード列を取り出す。配列以外は 1 レコード扱い
fn sections(document: &Value) -> Vec<(&str, Vec<&Value>)> {
    let Some(map) = document.as_object() else {
        return Vec::new();
    };

    map.iter()
        .map(|(key, value)| {
            let records = match value {
                Value::Array(items) => items.iter().collect(),
                Value::Null => Vec::new(),
                other => vec![other],
            };
            (key.as_str(), records)
        })
        .collect()
}

fn flatten(record: &Value) -> Vec<(String, String)> {
    let mut out = Vec::new();
    flatten_into("", record, &mut out);
    out
}

fn flatten_into(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    let join = |key: &str| {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", prefix, key)
        }
    };

    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, nested) in map {
                flatten_into(&join(key), nested, out);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (index, nested) in items.iter().enumerate() {
                flatten_into(&join(&index.to_string()), nested, out);
            }
        }
        Value::Object(_) | Value::Array(_) | Value::Null => {
            out.push((prefix.to_string(), String::new()));
        }
        Value::String(s) => out.push((prefix.to_string(), s.clone())),
        other => out.push((prefix.to_string(), other.to_string())),
    }
}
