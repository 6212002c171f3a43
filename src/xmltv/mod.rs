//! XMLTV emission
//!
//! Serializes channel timelines into an XMLTV document. One `<channel>` per
//! managed or team channel, one `<programme>` per program with explicit
//! timezone offsets. Programs are emitted in start order; the orchestrator
//! guarantees the gap-free invariant before anything reaches this writer.

use std::io::Cursor;

use anyhow::Result;
use chrono_tz::Tz;
use quick_xml::events::{BytesDecl, BytesText, Event as XmlEvent};
use quick_xml::Writer;

use crate::models::Program;
use crate::utils::DateTimeParser;

/// A channel entry for the `<channel>` section
#[derive(Debug, Clone)]
pub struct XmltvChannel {
    pub id: String,
    pub display_name: String,
    pub icon_url: Option<String>,
}

pub struct XmltvEmitter {
    timezone: Tz,
    generator_name: String,
}

impl XmltvEmitter {
    pub fn new(timezone: Tz) -> Self {
        Self {
            timezone,
            generator_name: format!("teamguide/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Render channels and their program timelines as an XMLTV document
    pub fn emit(&self, channels: &[(XmltvChannel, Vec<Program>)]) -> Result<String> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

        writer.write_event(XmlEvent::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        writer
            .create_element("tv")
            .with_attribute(("generator-info-name", self.generator_name.as_str()))
            .write_inner_content(|tv| {
                for (channel, _) in channels {
                    tv.create_element("channel")
                        .with_attribute(("id", channel.id.as_str()))
                        .write_inner_content(|node| {
                            node.create_element("display-name")
                                .write_text_content(BytesText::new(&channel.display_name))?;
                            if let Some(icon) = &channel.icon_url {
                                node.create_element("icon")
                                    .with_attribute(("src", icon.as_str()))
                                    .write_empty()?;
                            }
                            Ok::<(), quick_xml::Error>(())
                        })?;
                }

                for (channel, programs) in channels {
                    let mut ordered: Vec<&Program> = programs.iter().collect();
                    ordered.sort_by_key(|program| program.start);

                    for program in ordered {
                        let start = DateTimeParser::format_xmltv(&program.start, &self.timezone);
                        let stop = DateTimeParser::format_xmltv(&program.end, &self.timezone);
                        tv.create_element("programme")
                            .with_attribute(("start", start.as_str()))
                            .with_attribute(("stop", stop.as_str()))
                            .with_attribute(("channel", channel.id.as_str()))
                            .write_inner_content(|node| {
                                node.create_element("title")
                                    .with_attribute(("lang", "en"))
                                    .write_text_content(BytesText::new(&program.title))?;
                                if !program.subtitle.is_empty() {
                                    node.create_element("sub-title")
                                        .with_attribute(("lang", "en"))
                                        .write_text_content(BytesText::new(&program.subtitle))?;
                                }
                                if !program.description.is_empty() {
                                    node.create_element("desc")
                                        .with_attribute(("lang", "en"))
                                        .write_text_content(BytesText::new(
                                            &program.description,
                                        ))?;
                                }
                                if let Some(icon) = &program.art_url {
                                    node.create_element("icon")
                                        .with_attribute(("src", icon.as_str()))
                                        .write_empty()?;
                                }
                                for category in &program.categories {
                                    if !category.is_empty() {
                                        node.create_element("category")
                                            .with_attribute(("lang", "en"))
                                            .write_text_content(BytesText::new(category))?;
                                    }
                                }
                                Ok::<(), quick_xml::Error>(())
                            })?;
                    }
                }
                Ok::<(), quick_xml::Error>(())
            })?;

        let bytes = writer.into_inner().into_inner();
        Ok(String::from_utf8(bytes)?)
    }
}
