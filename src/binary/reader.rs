//! Validation and decoding of cache images.

use std::collections::HashMap;

use xxhash_rust::xxh3::xxh3_64;

use super::{CacheDefect, Header, HEADER_LEN, MAGIC};
use crate::model::{ApiClass, ApiRef, ApiVersions};

/// Validate a complete cache image: header shape, declared length, and
/// payload checksum, in that order. No payload byte is interpreted before
/// all three checks pass.
pub fn validate(bytes: &[u8]) -> Result<Header, CacheDefect> {
    if bytes.len() < HEADER_LEN {
        return Err(CacheDefect::TruncatedHeader {
            len: bytes.len() as u64,
        });
    }
    if bytes[..MAGIC.len()] != MAGIC {
        return Err(CacheDefect::BadMagic);
    }

    let header = Header {
        format_version: read_u32_at(bytes, 8),
        platform: read_u32_at(bytes, 12),
        payload_len: read_u64_at(bytes, 16),
        checksum: read_u64_at(bytes, 24),
    };

    let declared = HEADER_LEN as u64 + header.payload_len;
    if declared != bytes.len() as u64 {
        return Err(CacheDefect::LengthMismatch {
            declared,
            actual: bytes.len() as u64,
        });
    }
    if xxh3_64(&bytes[HEADER_LEN..]) != header.checksum {
        return Err(CacheDefect::ChecksumMismatch);
    }
    Ok(header)
}

/// Decode the payload of a validated image into the class map.
///
/// Returns the stored schema version alongside the classes. With the
/// checksum already verified a record error here means the encoder and
/// decoder disagree, which still surfaces as a defect rather than a panic.
pub fn decode_payload(payload: &[u8]) -> Result<(u32, HashMap<String, ApiClass>), CacheDefect> {
    let mut cursor = Cursor {
        buf: payload,
        pos: 0,
    };

    let schema_version = cursor.take_u32()?;
    let class_count = cursor.take_u32()?;
    let mut classes = HashMap::with_capacity(class_count as usize);

    for _ in 0..class_count {
        let class = decode_class(&mut cursor)?;
        classes.insert(class.name.clone(), class);
    }
    Ok((schema_version, classes))
}

fn decode_class(cursor: &mut Cursor<'_>) -> Result<ApiClass, CacheDefect> {
    let name = cursor.take_str()?;
    let versions = take_versions(cursor)?;
    let mut class = ApiClass::new(name, versions);

    let super_count = cursor.take_u16()?;
    for _ in 0..super_count {
        class.superclasses.push(take_link(cursor)?);
    }
    let iface_count = cursor.take_u16()?;
    for _ in 0..iface_count {
        class.interfaces.push(take_link(cursor)?);
    }

    let method_count = cursor.take_u32()?;
    for _ in 0..method_count {
        let key = cursor.take_str()?;
        class.methods.insert(key, take_versions(cursor)?);
    }
    let field_count = cursor.take_u32()?;
    for _ in 0..field_count {
        let key = cursor.take_str()?;
        class.fields.insert(key, take_versions(cursor)?);
    }
    Ok(class)
}

fn take_link(cursor: &mut Cursor<'_>) -> Result<ApiRef, CacheDefect> {
    Ok(ApiRef {
        name: cursor.take_str()?,
        since: cursor.take_u32()?,
    })
}

fn take_versions(cursor: &mut Cursor<'_>) -> Result<ApiVersions, CacheDefect> {
    let since = cursor.take_u32()?;
    let deprecated = cursor.take_u32()?;
    let removed = cursor.take_u32()?;
    Ok(ApiVersions {
        since,
        deprecated_in: (deprecated != 0).then_some(deprecated),
        removed_in: (removed != 0).then_some(removed),
    })
}

fn read_u32_at(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
}

fn read_u64_at(bytes: &[u8], offset: usize) -> u64 {
    u64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap())
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], CacheDefect> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.buf.len())
            .ok_or(CacheDefect::MalformedRecord)?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn take_u16(&mut self) -> Result<u16, CacheDefect> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into().unwrap()))
    }

    fn take_u32(&mut self) -> Result<u32, CacheDefect> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn take_str(&mut self) -> Result<String, CacheDefect> {
        let len = self.take_u16()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CacheDefect::MalformedRecord)
    }
}
