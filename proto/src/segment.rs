// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Segment wire encoding
//!
//! ## Encoding
//!
//! ```text
//! CODE:NUMBER:VERSION[:REF]+DE:DE:...+DE+@3@BIN'
//! ```
//!
//! - `'` terminates a segment, `+` separates top-level items and `:`
//!   separates the data elements of a group
//! - `?` releases (escapes) the following byte
//! - `@len@` prefixes binary data elements, which are copied verbatim
//!
//! Top-level groups contribute their children as `+` separated items,
//! anything nested deeper is flattened with `:`.

use alloc::{
    string::{String, ToString},
    vec::Vec,
};
use core::str::from_utf8;

use encdec::{DecodeOwned, Encode};

#[cfg(feature = "log")]
use log::trace;

use crate::{Element, ElementKind, ElementTree, Error, NodeId};

/// Segment terminator
pub const SEG_END: u8 = b'\'';
/// Separator between top-level items
pub const DEG_SEP: u8 = b'+';
/// Separator between data elements of a group
pub const DE_SEP: u8 = b':';
/// Release (escape) character
pub const ESCAPE: u8 = b'?';
/// Binary length prefix marker
pub const BINARY: u8 = b'@';

/// Encoded segment
#[derive(Clone, Debug)]
pub struct Segment {
    /// Segment code (eg. `HKSAL`)
    pub code: String,
    /// Position of the segment within its message
    pub number: u32,
    /// Segment version
    pub version: u32,
    /// Request segment referenced by a response segment
    pub reference: Option<u32>,
    /// Segment content (excluding the header)
    pub elements: ElementTree,
}

impl Segment {
    /// Create an empty segment
    pub fn new(code: &str, version: u32) -> Self {
        Self {
            code: code.to_string(),
            number: 0,
            version,
            reference: None,
            elements: ElementTree::new(),
        }
    }

    pub fn with_number(mut self, number: u32) -> Self {
        self.number = number;
        self
    }

    pub fn with_reference(mut self, reference: u32) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Append a DEG of text / byte values
    pub fn push_deg(&mut self, values: &[&[u8]]) -> NodeId {
        let root = self.elements.root();
        let deg = self.elements.add_child(root, Element::deg(""));
        for v in values {
            self.elements.add_child(deg, Element::de("").with_data(v));
        }
        deg
    }

    /// Append a DEG holding a single binary element
    pub fn push_binary(&mut self, value: &[u8]) -> NodeId {
        let root = self.elements.root();
        let deg = self.elements.add_child(root, Element::deg(""));
        self.elements
            .add_child(deg, Element::de("").with_data(value).binary());
        deg
    }

    /// Number of top-level items
    pub fn len(&self) -> usize {
        self.elements.children(self.elements.root()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetch raw data of the `de`th data element within the `deg`th item
    pub fn value(&self, deg: usize, de: usize) -> Option<&[u8]> {
        let root = self.elements.root();
        let item = *self.elements.children(root).get(deg)?;

        let id = match self.elements.kind(item)? {
            ElementKind::De if de == 0 => item,
            ElementKind::De => return None,
            _ => *self.elements.leaves(item).get(de)?,
        };

        self.elements.get(id)?.data.as_deref()
    }

    /// Fetch a non-empty text value, see [Segment::value]
    pub fn text(&self, deg: usize, de: usize) -> Option<&str> {
        self.value(deg, de)
            .filter(|v| !v.is_empty())
            .and_then(|v| from_utf8(v).ok())
    }

    /// Encode into a newly allocated buffer
    pub fn to_vec(&self) -> Result<Vec<u8>, Error> {
        let mut buff = alloc::vec![0u8; self.encode_len()?];
        let n = self.encode(&mut buff)?;
        buff.truncate(n);
        Ok(buff)
    }

    fn write<S: Sink>(&self, s: &mut S) -> Result<(), Error> {
        // Header
        write_escaped(s, self.code.as_bytes())?;
        s.put(&[DE_SEP])?;
        write_number(s, self.number)?;
        s.put(&[DE_SEP])?;
        write_number(s, self.version)?;
        if let Some(r) = self.reference {
            s.put(&[DE_SEP])?;
            write_number(s, r)?;
        }

        // Content
        let root = self.elements.root();
        for c in self.elements.children(root) {
            s.put(&[DEG_SEP])?;
            write_item(&self.elements, *c, s)?;
        }

        s.put(&[SEG_END])
    }
}

/// Byte sink used for both length computation and encoding
trait Sink {
    fn put(&mut self, b: &[u8]) -> Result<(), Error>;
}

struct Counter(usize);

impl Sink for Counter {
    fn put(&mut self, b: &[u8]) -> Result<(), Error> {
        self.0 += b.len();
        Ok(())
    }
}

struct Cursor<'a> {
    buff: &'a mut [u8],
    index: usize,
}

impl<'a> Sink for Cursor<'a> {
    fn put(&mut self, b: &[u8]) -> Result<(), Error> {
        if self.buff.len() < self.index + b.len() {
            return Err(Error::InvalidLength);
        }

        self.buff[self.index..][..b.len()].copy_from_slice(b);
        self.index += b.len();

        Ok(())
    }
}

fn write_number<S: Sink>(s: &mut S, n: u32) -> Result<(), Error> {
    s.put(n.to_string().as_bytes())
}

fn write_escaped<S: Sink>(s: &mut S, data: &[u8]) -> Result<(), Error> {
    for b in data {
        if matches!(*b, DEG_SEP | DE_SEP | SEG_END | ESCAPE | BINARY) {
            s.put(&[ESCAPE])?;
        }
        s.put(&[*b])?;
    }
    Ok(())
}

/// Write a top-level item, groups expand to `+` separated items
fn write_item<S: Sink>(t: &ElementTree, id: NodeId, s: &mut S) -> Result<(), Error> {
    match t.get(id) {
        Some(e) if e.kind == ElementKind::Group => {
            for (i, c) in t.children(id).iter().enumerate() {
                if i > 0 {
                    s.put(&[DEG_SEP])?;
                }
                write_item(t, *c, s)?;
            }
            Ok(())
        }
        Some(_) => write_inner(t, id, s),
        None => Err(Error::InvalidNode),
    }
}

/// Write nested content, containers flatten to `:` separated elements
fn write_inner<S: Sink>(t: &ElementTree, id: NodeId, s: &mut S) -> Result<(), Error> {
    let e = t.get(id).ok_or(Error::InvalidNode)?;

    match (e.kind, &e.data) {
        (ElementKind::De, Some(d)) if e.binary => {
            s.put(&[BINARY])?;
            s.put(d.len().to_string().as_bytes())?;
            s.put(&[BINARY])?;
            s.put(d)
        }
        (ElementKind::De, Some(d)) => write_escaped(s, d),
        (ElementKind::De, None) => Ok(()),
        _ => {
            for (i, c) in t.children(id).iter().enumerate() {
                if i > 0 {
                    s.put(&[DE_SEP])?;
                }
                write_inner(t, *c, s)?;
            }
            Ok(())
        }
    }
}

impl Encode for Segment {
    type Error = Error;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        let mut c = Counter(0);
        self.write(&mut c)?;
        Ok(c.0)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        let mut c = Cursor { buff, index: 0 };
        self.write(&mut c)?;
        Ok(c.index)
    }
}

impl DecodeOwned for Segment {
    type Output = Segment;

    type Error = Error;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        let mut items: Vec<Vec<(Vec<u8>, bool)>> = Vec::new();
        let mut deg: Vec<(Vec<u8>, bool)> = Vec::new();
        let mut de = Vec::new();
        let mut binary = false;
        let mut index = 0;

        loop {
            let b = *buff.get(index).ok_or(Error::Unterminated)?;
            index += 1;

            match b {
                ESCAPE => {
                    let n = *buff.get(index).ok_or(Error::Unterminated)?;
                    de.push(n);
                    index += 1;
                }
                BINARY if de.is_empty() && !binary => {
                    // Read length up to the closing marker
                    let rest = &buff[index..];
                    let end = rest
                        .iter()
                        .position(|c| *c == BINARY)
                        .ok_or(Error::InvalidBinary)?;
                    let len: usize = from_utf8(&rest[..end])
                        .map_err(|_| Error::InvalidBinary)?
                        .parse()
                        .map_err(|_| Error::InvalidBinary)?;
                    index += end + 1;

                    let data = index
                        .checked_add(len)
                        .and_then(|end| buff.get(index..end))
                        .ok_or(Error::InvalidBinary)?;
                    de.extend_from_slice(data);
                    index += len;
                    binary = true;
                }
                DE_SEP => {
                    deg.push((core::mem::take(&mut de), binary));
                    binary = false;
                }
                DEG_SEP => {
                    deg.push((core::mem::take(&mut de), binary));
                    items.push(core::mem::take(&mut deg));
                    binary = false;
                }
                SEG_END => {
                    deg.push((core::mem::take(&mut de), binary));
                    items.push(core::mem::take(&mut deg));
                    break;
                }
                _ => de.push(b),
            }
        }

        let mut items = items.into_iter();

        // Parse header
        let header = items.next().ok_or(Error::InvalidHeader)?;
        if header.len() < 3 {
            return Err(Error::InvalidHeader);
        }
        let code = from_utf8(&header[0].0).map_err(|_| Error::Utf8)?;
        if code.is_empty() {
            return Err(Error::InvalidHeader);
        }

        let mut s = Segment::new(code, parse_number(&header[2].0)?)
            .with_number(parse_number(&header[1].0)?);
        if let Some((r, _)) = header.get(3).filter(|(r, _)| !r.is_empty()) {
            s.reference = Some(parse_number(r)?);
        }

        // Parse content
        let root = s.elements.root();
        for item in items {
            let deg = s.elements.add_child(root, Element::deg(""));
            for (data, binary) in item {
                let mut e = Element::de("").with_data(data);
                e.binary = binary;
                s.elements.add_child(deg, e);
            }
        }

        #[cfg(feature = "log")]
        trace!("Decoded segment {}:{} ({} bytes)", s.code, s.number, index);

        Ok((s, index))
    }
}

fn parse_number(v: &[u8]) -> Result<u32, Error> {
    from_utf8(v)
        .map_err(|_| Error::InvalidNumber)?
        .parse()
        .map_err(|_| Error::InvalidNumber)
}

/// Decode every segment in a message body
pub fn decode_all(buff: &[u8]) -> Result<Vec<Segment>, Error> {
    let mut segments = Vec::new();
    let mut index = 0;

    while index < buff.len() {
        // Tolerate line breaks between segments
        if matches!(buff[index], b'\r' | b'\n') {
            index += 1;
            continue;
        }

        let (s, n) = Segment::decode_owned(&buff[index..])?;
        segments.push(s);
        index += n;
    }

    Ok(segments)
}
