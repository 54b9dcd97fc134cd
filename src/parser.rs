//! Parser for the canonical `api-versions.xml` API description.
//!
//! The document maps classes to members and hierarchy links, each carrying
//! `since`/`deprecated`/`removed` API levels:
//!
//! ```xml
//! <api version="2">
//!     <class name="android/app/Activity" since="1">
//!         <extends name="android/view/ContextThemeWrapper" since="5"/>
//!         <implements name="android/view/Window$Callback"/>
//!         <method name="onCreate(Landroid/os/Bundle;)V"/>
//!         <field name="FOCUSED_STATE_SET" since="3"/>
//!     </class>
//! </api>
//! ```
//!
//! Unknown elements and attributes are skipped for forward compatibility.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::model::{Api, ApiClass, ApiLevel, ApiRef, ApiVersions};
use crate::names;

/// Errors produced while reading an API description document.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed XML at byte {position}: {source}")]
    Xml {
        position: usize,
        #[source]
        source: quick_xml::Error,
    },
    #[error("{message} (at byte {position})")]
    Document { message: String, position: usize },
}

/// Parse an API description from a file on disk.
pub fn parse_file(path: &Path) -> Result<Api, ParseError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_document(&contents)
}

/// Parse an API description document.
pub fn parse_document(contents: &str) -> Result<Api, ParseError> {
    let mut reader = Reader::from_str(contents);
    reader.trim_text(true);

    let mut api = Api::new(0);
    let mut current: Option<ApiClass> = None;
    let mut buf = Vec::new();

    loop {
        let position = reader.buffer_position();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                handle_element(&mut api, &mut current, e, position)?;
            }
            Ok(Event::Empty(ref e)) => {
                handle_element(&mut api, &mut current, e, position)?;
                // A childless class is complete as soon as it opens
                if e.name().as_ref() == b"class" {
                    finish_class(&mut api, &mut current);
                }
            }
            Ok(Event::End(ref e)) => {
                if e.name().as_ref() == b"class" {
                    finish_class(&mut api, &mut current);
                }
            }
            Ok(Event::Eof) => break,
            Err(source) => return Err(ParseError::Xml { position, source }),
            _ => {}
        }
        buf.clear();
    }

    debug!(
        "Parsed API description: schema v{}, {} classes",
        api.schema_version,
        api.classes.len()
    );

    Ok(api)
}

/// Attributes recognized on any element; unknown ones are skipped.
#[derive(Default)]
struct ElementAttrs {
    name: Option<String>,
    version: Option<ApiLevel>,
    since: Option<ApiLevel>,
    deprecated: Option<ApiLevel>,
    removed: Option<ApiLevel>,
}

fn handle_element(
    api: &mut Api,
    current: &mut Option<ApiClass>,
    element: &BytesStart<'_>,
    position: usize,
) -> Result<(), ParseError> {
    let tag = element.name();
    match tag.as_ref() {
        b"api" => {
            let attrs = read_attrs(element, position)?;
            api.schema_version = attrs.version.unwrap_or(1);
        }
        b"class" => {
            let attrs = read_attrs(element, position)?;
            let name = require_name(&attrs, "class", position)?;
            let versions = member_versions(&attrs, 1, "class", &name, position)?;
            *current = Some(ApiClass::new(names::canonicalize(&name), versions));
        }
        b"extends" | b"implements" => {
            let attrs = read_attrs(element, position)?;
            let class = enclosing_class(current, tag.as_ref(), position)?;
            let name = require_name(&attrs, "hierarchy link", position)?;
            let link = ApiRef {
                name: names::canonicalize(&name),
                since: attrs.since.unwrap_or(class.versions.since),
            };
            if tag.as_ref() == b"extends" {
                class.superclasses.push(link);
            } else {
                class.interfaces.push(link);
            }
        }
        b"method" => {
            let attrs = read_attrs(element, position)?;
            let class = enclosing_class(current, b"method", position)?;
            let signature = require_name(&attrs, "method", position)?;
            let (name, descriptor) = names::split_signature(&signature);
            let Some(descriptor) = descriptor else {
                return Err(ParseError::Document {
                    message: format!("method '{}' is missing a parameter list", signature),
                    position,
                });
            };
            let versions =
                member_versions(&attrs, class.versions.since, "method", &signature, position)?;
            class
                .methods
                .insert(names::method_key(name, descriptor), versions);
        }
        b"field" => {
            let attrs = read_attrs(element, position)?;
            let class = enclosing_class(current, b"field", position)?;
            let name = require_name(&attrs, "field", position)?;
            let versions = member_versions(&attrs, class.versions.since, "field", &name, position)?;
            class.fields.insert(name, versions);
        }
        _ => {}
    }
    Ok(())
}

fn finish_class(api: &mut Api, current: &mut Option<ApiClass>) {
    if let Some(class) = current.take() {
        api.classes.insert(class.name.clone(), class);
    }
}

fn read_attrs(element: &BytesStart<'_>, position: usize) -> Result<ElementAttrs, ParseError> {
    let mut attrs = ElementAttrs::default();
    for attr in element.attributes().filter_map(|a| a.ok()) {
        let value = attr
            .unescape_value()
            .map_err(|source| ParseError::Xml { position, source })?;
        match attr.key.as_ref() {
            b"name" => attrs.name = Some(value.into_owned()),
            b"version" => attrs.version = Some(parse_level(&value, "version", position)?),
            b"since" => attrs.since = Some(parse_level(&value, "since", position)?),
            b"deprecated" => attrs.deprecated = Some(parse_level(&value, "deprecated", position)?),
            b"removed" => attrs.removed = Some(parse_level(&value, "removed", position)?),
            _ => {}
        }
    }
    Ok(attrs)
}

fn parse_level(value: &str, attribute: &str, position: usize) -> Result<ApiLevel, ParseError> {
    value.parse().map_err(|_| ParseError::Document {
        message: format!("attribute '{}' is not an API level: '{}'", attribute, value),
        position,
    })
}

fn require_name(attrs: &ElementAttrs, what: &str, position: usize) -> Result<String, ParseError> {
    attrs.name.clone().ok_or_else(|| ParseError::Document {
        message: format!("{} element is missing its name", what),
        position,
    })
}

fn enclosing_class<'a>(
    current: &'a mut Option<ApiClass>,
    tag: &[u8],
    position: usize,
) -> Result<&'a mut ApiClass, ParseError> {
    current.as_mut().ok_or_else(|| ParseError::Document {
        message: format!(
            "'{}' element outside of a class",
            String::from_utf8_lossy(tag)
        ),
        position,
    })
}

fn member_versions(
    attrs: &ElementAttrs,
    default_since: ApiLevel,
    what: &str,
    name: &str,
    position: usize,
) -> Result<ApiVersions, ParseError> {
    let versions = ApiVersions {
        since: attrs.since.unwrap_or(default_since),
        deprecated_in: attrs.deprecated,
        removed_in: attrs.removed,
    };
    if !versions.is_consistent() {
        return Err(ParseError::Document {
            message: format!("{} '{}' has inconsistent API levels ({})", what, name, versions),
            position,
        });
    }
    Ok(versions)
}
