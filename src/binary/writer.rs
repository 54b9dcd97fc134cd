//! Encoder for the binary cache format.
//!
//! Output is deterministic: classes and member tables are written in
//! sorted order, so two builders racing on the same source produce
//! byte-identical files.

use xxhash_rust::xxh3::xxh3_64;

use super::{FORMAT_VERSION, HEADER_LEN, MAGIC};
use crate::model::{Api, ApiClass, ApiLevel, ApiRef, ApiVersions};

/// Encode a parsed API surface into a complete cache image (header +
/// payload).
pub fn encode(api: &Api, platform: ApiLevel) -> Vec<u8> {
    let payload = encode_payload(api);
    let checksum = xxh3_64(&payload);

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&platform.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    out.extend_from_slice(&checksum.to_le_bytes());
    out.resize(HEADER_LEN, 0);
    out.extend_from_slice(&payload);
    out
}

fn encode_payload(api: &Api) -> Vec<u8> {
    let mut buf = Vec::new();
    put_u32(&mut buf, api.schema_version);
    put_u32(&mut buf, api.classes.len() as u32);

    let mut names: Vec<&String> = api.classes.keys().collect();
    names.sort();
    for name in names {
        encode_class(&mut buf, &api.classes[name]);
    }
    buf
}

fn encode_class(buf: &mut Vec<u8>, class: &ApiClass) {
    put_str(buf, &class.name);
    put_versions(buf, &class.versions);

    put_u16(buf, class.superclasses.len() as u16);
    for link in &class.superclasses {
        encode_link(buf, link);
    }
    put_u16(buf, class.interfaces.len() as u16);
    for link in &class.interfaces {
        encode_link(buf, link);
    }

    encode_member_table(buf, &class.methods);
    encode_member_table(buf, &class.fields);
}

fn encode_link(buf: &mut Vec<u8>, link: &ApiRef) {
    put_str(buf, &link.name);
    put_u32(buf, link.since);
}

fn encode_member_table(buf: &mut Vec<u8>, table: &std::collections::HashMap<String, ApiVersions>) {
    put_u32(buf, table.len() as u32);
    let mut keys: Vec<&String> = table.keys().collect();
    keys.sort();
    for key in keys {
        put_str(buf, key);
        put_versions(buf, &table[key]);
    }
}

fn put_versions(buf: &mut Vec<u8>, versions: &ApiVersions) {
    put_u32(buf, versions.since);
    put_u32(buf, versions.deprecated_in.unwrap_or(0));
    put_u32(buf, versions.removed_in.unwrap_or(0));
}

fn put_u16(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn put_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn put_str(buf: &mut Vec<u8>, value: &str) {
    // JVM class and member names are far below the u16 limit
    put_u16(buf, value.len() as u16);
    buf.extend_from_slice(value.as_bytes());
}
