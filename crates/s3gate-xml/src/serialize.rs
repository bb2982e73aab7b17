//! S3 XML serialization of gateway responses.
//!
//! Every response body is produced by [`to_xml`], which writes the XML declaration and a
//! namespaced root element and lets the [`S3Serialize`] implementation fill in children.

use std::io::{self, Write};

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesText, Event};
use s3gate_model::output::{GetBucketAclOutput, ListBucketsOutput, ListObjectsV2Output};
use s3gate_model::types::{Bucket, CommonPrefix, Grant, Grantee, Object, Owner};

use crate::error::XmlError;

/// The S3 XML namespace.
pub const S3_NAMESPACE: &str = "http://s3.amazonaws.com/doc/2006-03-01/";

const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Trait for serializing S3 types to XML.
///
/// Implementors write their content as child elements inside the current XML context.
/// The root element name and namespace are handled by [`to_xml`].
pub trait S3Serialize {
    /// Serialize this value as XML child elements into the given writer.
    ///
    /// # Errors
    ///
    /// Returns `io::Error` if writing to the underlying writer fails.
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()>;
}

/// Serialize a value as an S3 XML document rooted at `root_element`.
///
/// # Errors
///
/// Returns `XmlError` if serialization fails.
pub fn to_xml<T: S3Serialize>(root_element: &str, value: &T) -> Result<Vec<u8>, XmlError> {
    let mut buf = Vec::with_capacity(512);
    let mut writer = Writer::new(&mut buf);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer
        .create_element(root_element)
        .with_attribute(("xmlns", S3_NAMESPACE))
        .write_inner_content(|w| value.serialize_xml(w))?;

    Ok(buf)
}

/// Format a `DateTime<Utc>` as ISO 8601 with milliseconds and `Z` suffix.
#[must_use]
pub fn format_timestamp(dt: &chrono::DateTime<chrono::Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

fn write_text_element<W: Write>(writer: &mut Writer<W>, tag: &str, text: &str) -> io::Result<()> {
    writer
        .create_element(tag)
        .write_text_content(BytesText::new(text))?;
    Ok(())
}

fn write_optional_text<W: Write>(
    writer: &mut Writer<W>,
    tag: &str,
    value: Option<&str>,
) -> io::Result<()> {
    if let Some(v) = value {
        write_text_element(writer, tag, v)?;
    }
    Ok(())
}

fn write_optional_bool<W: Write>(
    writer: &mut Writer<W>,
    tag: &str,
    value: Option<bool>,
) -> io::Result<()> {
    if let Some(v) = value {
        write_text_element(writer, tag, if v { "true" } else { "false" })?;
    }
    Ok(())
}

fn write_optional_number<W: Write, N: ToString>(
    writer: &mut Writer<W>,
    tag: &str,
    value: Option<N>,
) -> io::Result<()> {
    if let Some(v) = value {
        write_text_element(writer, tag, &v.to_string())?;
    }
    Ok(())
}

fn write_optional_timestamp<W: Write>(
    writer: &mut Writer<W>,
    tag: &str,
    value: Option<&chrono::DateTime<chrono::Utc>>,
) -> io::Result<()> {
    if let Some(v) = value {
        write_text_element(writer, tag, &format_timestamp(v))?;
    }
    Ok(())
}

impl S3Serialize for Owner {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        writer.create_element("Owner").write_inner_content(|w| {
            write_optional_text(w, "ID", self.id.as_deref())?;
            write_optional_text(w, "DisplayName", self.display_name.as_deref())?;
            Ok(())
        })?;
        Ok(())
    }
}

impl S3Serialize for Grantee {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        writer
            .create_element("Grantee")
            .with_attribute(("xmlns:xsi", XSI_NAMESPACE))
            .with_attribute(("xsi:type", self.r#type.as_str()))
            .write_inner_content(|w| {
                write_optional_text(w, "ID", self.id.as_deref())?;
                write_optional_text(w, "DisplayName", self.display_name.as_deref())?;
                write_optional_text(w, "URI", self.uri.as_deref())?;
                Ok(())
            })?;
        Ok(())
    }
}

impl S3Serialize for Grant {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        writer.create_element("Grant").write_inner_content(|w| {
            if let Some(ref grantee) = self.grantee {
                grantee.serialize_xml(w)?;
            }
            write_optional_text(w, "Permission", self.permission.map(|p| p.as_str()))?;
            Ok(())
        })?;
        Ok(())
    }
}

impl S3Serialize for Bucket {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        writer.create_element("Bucket").write_inner_content(|w| {
            write_optional_text(w, "Name", self.name.as_deref())?;
            write_optional_timestamp(w, "CreationDate", self.creation_date.as_ref())?;
            Ok(())
        })?;
        Ok(())
    }
}

impl S3Serialize for CommonPrefix {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        writer
            .create_element("CommonPrefixes")
            .write_inner_content(|w| write_optional_text(w, "Prefix", self.prefix.as_deref()))?;
        Ok(())
    }
}

impl S3Serialize for Object {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        writer.create_element("Contents").write_inner_content(|w| {
            write_optional_text(w, "Key", self.key.as_deref())?;
            write_optional_timestamp(w, "LastModified", self.last_modified.as_ref())?;
            write_optional_text(w, "ETag", self.e_tag.as_deref())?;
            write_optional_number(w, "Size", self.size)?;
            write_optional_text(w, "StorageClass", self.storage_class.as_deref())?;
            Ok(())
        })?;
        Ok(())
    }
}

/// Root: `ListAllMyBucketsResult`.
impl S3Serialize for ListBucketsOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        if let Some(ref owner) = self.owner {
            owner.serialize_xml(writer)?;
        }
        writer.create_element("Buckets").write_inner_content(|w| {
            for bucket in &self.buckets {
                bucket.serialize_xml(w)?;
            }
            Ok(())
        })?;
        Ok(())
    }
}

/// Root: `ListBucketResult`.
impl S3Serialize for ListObjectsV2Output {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_optional_text(writer, "Name", self.name.as_deref())?;
        write_optional_text(writer, "Prefix", self.prefix.as_deref())?;
        write_optional_text(writer, "Delimiter", self.delimiter.as_deref())?;
        write_optional_number(writer, "MaxKeys", self.max_keys)?;
        write_optional_text(writer, "EncodingType", self.encoding_type.map(|e| e.as_str()))?;
        write_optional_number(writer, "KeyCount", self.key_count)?;
        write_optional_bool(writer, "IsTruncated", self.is_truncated)?;
        write_optional_text(writer, "ContinuationToken", self.continuation_token.as_deref())?;
        write_optional_text(
            writer,
            "NextContinuationToken",
            self.next_continuation_token.as_deref(),
        )?;
        write_optional_text(writer, "StartAfter", self.start_after.as_deref())?;
        for obj in &self.contents {
            obj.serialize_xml(writer)?;
        }
        for cp in &self.common_prefixes {
            cp.serialize_xml(writer)?;
        }
        Ok(())
    }
}

/// Root: `AccessControlPolicy`.
impl S3Serialize for GetBucketAclOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        if let Some(ref owner) = self.owner {
            owner.serialize_xml(writer)?;
        }
        writer
            .create_element("AccessControlList")
            .write_inner_content(|w| {
                for grant in &self.grants {
                    grant.serialize_xml(w)?;
                }
                Ok(())
            })?;
        Ok(())
    }
}
