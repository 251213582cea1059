//! Metadata API SOAP envelopes and response parsing.

use crate::types::{ChangesError, ItemDescriptor, ListQuery, MetadataTypeInfo, Result};
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;

const ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const METADATA_NS: &str = "http://soap.sforce.com/2006/04/metadata";

/// Child elements of one repeated response element, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoapRecord {
    fields: Vec<(String, String)>,
}

impl SoapRecord {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn get_all(&self, name: &str) -> Vec<String> {
        self.fields
            .iter()
            .filter(|(field, _)| field == name)
            .map(|(_, value)| value.clone())
            .collect()
    }

    fn flag(&self, name: &str) -> bool {
        self.get(name) == Some("true")
    }

    fn optional(&self, name: &str) -> Option<String> {
        self.get(name).filter(|v| !v.is_empty()).map(|v| v.to_string())
    }
}

pub fn envelope(session_id: &str, body: &str) -> String {
    format!(
        concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>",
            "<soapenv:Envelope xmlns:soapenv=\"{}\" xmlns:met=\"{}\">",
            "<soapenv:Header><met:SessionHeader><met:sessionId>{}</met:sessionId></met:SessionHeader></soapenv:Header>",
            "<soapenv:Body>{}</soapenv:Body>",
            "</soapenv:Envelope>"
        ),
        ENVELOPE_NS,
        METADATA_NS,
        escape(session_id),
        body
    )
}

pub fn describe_metadata_body(api_version: &str) -> String {
    format!(
        "<met:describeMetadata><met:asOfVersion>{}</met:asOfVersion></met:describeMetadata>",
        escape(api_version)
    )
}

pub fn list_metadata_body(queries: &[ListQuery], api_version: &str) -> String {
    let mut body = String::from("<met:listMetadata>");
    for query in queries {
        body.push_str("<met:queries>");
        if let Some(folder) = &query.folder {
            body.push_str(&format!("<met:folder>{}</met:folder>", escape(folder.as_str())));
        }
        body.push_str(&format!("<met:type>{}</met:type>", escape(query.type_name.as_str())));
        body.push_str("</met:queries>");
    }
    body.push_str(&format!("<met:asOfVersion>{}</met:asOfVersion>", escape(api_version)));
    body.push_str("</met:listMetadata>");
    body
}

/// Collect every `record_tag` element with its direct children.
///
/// Namespace prefixes are ignored. Nested children deeper than one level are
/// skipped, and self-closing children are recorded with an empty value.
pub fn parse_records(xml: &str, record_tag: &str) -> Result<Vec<SoapRecord>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut records = Vec::new();
    let mut current: Option<SoapRecord> = None;
    let mut record_depth = 0usize;
    let mut depth = 0usize;
    let mut field: Option<String> = None;
    let mut text = String::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ChangesError::Xml(format!("at byte {}: {}", reader.buffer_position(), e)))?;

        match event {
            Event::Start(e) => {
                depth += 1;
                let name = local_name(e.local_name().as_ref())?;
                if current.is_none() {
                    if name == record_tag {
                        current = Some(SoapRecord::default());
                        record_depth = depth;
                    }
                } else if depth == record_depth + 1 {
                    field = Some(name);
                    text.clear();
                }
            }
            Event::Empty(e) => {
                let name = local_name(e.local_name().as_ref())?;
                match current.as_mut() {
                    Some(record) if depth == record_depth => record.fields.push((name, String::new())),
                    Some(_) => {}
                    None if name == record_tag => records.push(SoapRecord::default()),
                    None => {}
                }
            }
            Event::Text(t) => {
                if field.is_some() {
                    let value = t.unescape().map_err(|e| ChangesError::Xml(e.to_string()))?;
                    text.push_str(&value);
                }
            }
            Event::CData(c) => {
                if field.is_some() {
                    text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(_) => {
                if let Some(record) = current.as_mut() {
                    if depth == record_depth + 1 {
                        if let Some(name) = field.take() {
                            record.fields.push((name, std::mem::take(&mut text)));
                        }
                    } else if depth == record_depth {
                        if let Some(done) = current.take() {
                            records.push(done);
                        }
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(records)
}

fn local_name(raw: &[u8]) -> Result<String> {
    std::str::from_utf8(raw)
        .map(|s| s.to_string())
        .map_err(|e| ChangesError::Xml(e.to_string()))
}

/// Turn a SOAP fault in `xml`, if present, into an error.
pub fn check_fault(xml: &str) -> Result<()> {
    if let Some(fault) = parse_records(xml, "Fault")?.into_iter().next() {
        return Err(ChangesError::Soap {
            code: fault.get("faultcode").unwrap_or("unknown").to_string(),
            message: fault.get("faultstring").unwrap_or("").to_string(),
        });
    }
    Ok(())
}

/// Items from a `listMetadataResponse`. No `<result>` at all means no items.
pub fn parse_list_metadata(xml: &str) -> Result<Vec<ItemDescriptor>> {
    check_fault(xml)?;

    let mut items = Vec::new();
    for record in parse_records(xml, "result")? {
        let (Some(type_name), Some(full_name)) = (record.optional("type"), record.optional("fullName")) else {
            debug!("Ignoring listMetadata result without type or fullName: {:?}", record);
            continue;
        };
        items.push(ItemDescriptor {
            type_name,
            full_name,
            last_modified_date: record.get("lastModifiedDate").unwrap_or_default().to_string(),
            created_date: record.get("createdDate").unwrap_or_default().to_string(),
            last_modified_by_name: record.get("lastModifiedByName").unwrap_or_default().to_string(),
            created_by_name: record.get("createdByName").unwrap_or_default().to_string(),
        });
    }
    Ok(items)
}

/// Catalog entries from a `describeMetadataResponse`.
pub fn parse_describe_metadata(xml: &str) -> Result<Vec<MetadataTypeInfo>> {
    check_fault(xml)?;

    let types = parse_records(xml, "metadataObjects")?
        .into_iter()
        .filter_map(|record| {
            let xml_name = record.optional("xmlName")?;
            Some(MetadataTypeInfo {
                xml_name,
                directory_name: record.optional("directoryName"),
                suffix: record.optional("suffix"),
                in_folder: record.flag("inFolder"),
                meta_file: record.flag("metaFile"),
                child_xml_names: record.get_all("childXmlNames"),
            })
        })
        .collect();
    Ok(types)
}
