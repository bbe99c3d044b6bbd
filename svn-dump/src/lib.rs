//! A writer for [Subversion dumpfile format version
//! 2](https://svn.apache.org/repos/asf/subversion/trunk/notes/dump-load-format.txt).
//!
//! The writer is deliberately low-level: callers hand it revisions and node
//! records in stream order and it owns the byte-exact encoding — header
//! blocks, property blocks, length prefixes, and content hashes.

use std::io::Write;

mod date;
pub use date::svn_date;

mod error;
pub use error::Error;

mod props;
pub use props::PropList;

use md5::{Digest, Md5};

/// A copy source for a node record.
#[derive(Debug, Clone, Copy)]
pub struct CopyFrom<'a> {
    pub revnum: u32,
    pub path: &'a str,
}

/// A writer that encodes a dumpfile stream onto the underlying writer.
#[derive(Debug)]
pub struct DumpWriter<W>
where
    W: Write,
{
    out: W,
}

impl<W> DumpWriter<W>
where
    W: Write,
{
    /// Constructs a dump writer and emits the format header.
    pub fn new(mut out: W) -> Result<Self, Error> {
        out.write_all(b"SVN-fs-dump-format-version: 2\n\n")?;
        Ok(Self { out })
    }

    /// Starts a new revision record. `props` normally carries `svn:author`,
    /// `svn:log`, and `svn:date`.
    pub fn start_revision(&mut self, revnum: u32, props: &PropList) -> Result<(), Error> {
        let body = props.encode();
        write!(
            self.out,
            "Revision-number: {}\nProp-content-length: {}\nContent-length: {}\n\n",
            revnum,
            body.len(),
            body.len()
        )?;
        self.out.write_all(&body)?;
        self.out.write_all(b"\n")?;

        Ok(())
    }

    pub fn add_directory(&mut self, path: &str, copy_from: Option<CopyFrom>) -> Result<(), Error> {
        self.node(path, "dir", "add", copy_from, None, None)
    }

    pub fn add_file(
        &mut self,
        path: &str,
        props: Option<&PropList>,
        text: &[u8],
    ) -> Result<(), Error> {
        self.node(path, "file", "add", None, props, Some(text))
    }

    /// A file added by copy; the content travels with the copy source.
    pub fn copy_file(&mut self, path: &str, copy_from: CopyFrom) -> Result<(), Error> {
        self.node(path, "file", "add", Some(copy_from), None, None)
    }

    pub fn change_file(
        &mut self,
        path: &str,
        props: Option<&PropList>,
        text: &[u8],
    ) -> Result<(), Error> {
        self.node(path, "file", "change", None, props, Some(text))
    }

    pub fn delete_path(&mut self, path: &str) -> Result<(), Error> {
        write!(self.out, "Node-path: {}\nNode-action: delete\n\n\n", path)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), Error> {
        Ok(self.out.flush()?)
    }

    fn node(
        &mut self,
        path: &str,
        kind: &str,
        action: &str,
        copy_from: Option<CopyFrom>,
        props: Option<&PropList>,
        text: Option<&[u8]>,
    ) -> Result<(), Error> {
        write!(
            self.out,
            "Node-path: {}\nNode-kind: {}\nNode-action: {}\n",
            path, kind, action
        )?;

        if let Some(copy_from) = copy_from {
            write!(
                self.out,
                "Node-copyfrom-rev: {}\nNode-copyfrom-path: {}\n",
                copy_from.revnum, copy_from.path
            )?;
        }

        let prop_body = props.map(|props| props.encode());
        let content_length = prop_body.as_ref().map_or(0, |body| body.len())
            + text.map_or(0, |text| text.len());

        if let Some(body) = &prop_body {
            write!(self.out, "Prop-content-length: {}\n", body.len())?;
        }
        if let Some(text) = text {
            write!(
                self.out,
                "Text-content-length: {}\nText-content-md5: {}\n",
                text.len(),
                md5_hex(text)
            )?;
        }
        if prop_body.is_some() || text.is_some() {
            write!(self.out, "Content-length: {}\n", content_length)?;
        }

        self.out.write_all(b"\n")?;
        if let Some(body) = &prop_body {
            self.out.write_all(body)?;
        }
        if let Some(text) = text {
            self.out.write_all(text)?;
        }
        self.out.write_all(b"\n\n")?;

        Ok(())
    }
}

pub fn md5_hex(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);

    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn revprops() -> PropList {
        let mut props = PropList::new();
        props.push("svn:author", "adam");
        props.push("svn:log", "change the frobnicator");
        props.push("svn:date", "2001-02-03T04:05:06.000000Z");
        props
    }

    #[test]
    fn test_md5_hex() {
        // The RFC 1321 test vectors.
        assert_eq!(md5_hex(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(md5_hex(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_stream_header() {
        let mut buf = Vec::new();
        DumpWriter::new(&mut buf).unwrap();
        assert_eq!(buf, b"SVN-fs-dump-format-version: 2\n\n");
    }

    #[test]
    fn test_revision_record() {
        let mut buf = Vec::new();
        let mut writer = DumpWriter::new(&mut buf).unwrap();
        writer.start_revision(1, &revprops()).unwrap();

        let text = String::from_utf8(buf).unwrap();
        let body = revprops().encode();
        assert!(text.contains(&format!(
            "Revision-number: 1\nProp-content-length: {}\nContent-length: {}\n\n",
            body.len(),
            body.len()
        )));
        assert!(text.contains("PROPS-END\n"));
    }

    #[test]
    fn test_file_node_record() {
        let mut buf = Vec::new();
        let mut writer = DumpWriter::new(&mut buf).unwrap();
        writer.add_file("trunk/hello", None, b"hi\n").unwrap();

        let text = String::from_utf8(buf).unwrap();
        let expected = format!(
            "Node-path: trunk/hello\nNode-kind: file\nNode-action: add\n\
             Text-content-length: 3\nText-content-md5: {}\nContent-length: 3\n\nhi\n\n\n",
            md5_hex(b"hi\n")
        );
        assert!(text.ends_with(&expected), "got: {:?}", text);
    }

    #[test]
    fn test_copy_node_record() {
        let mut buf = Vec::new();
        let mut writer = DumpWriter::new(&mut buf).unwrap();
        writer
            .add_directory(
                "tags/R1",
                Some(CopyFrom {
                    revnum: 4,
                    path: "trunk",
                }),
            )
            .unwrap();

        let text = String::from_utf8(buf).unwrap();
        assert!(text.ends_with(
            "Node-path: tags/R1\nNode-kind: dir\nNode-action: add\n\
             Node-copyfrom-rev: 4\nNode-copyfrom-path: trunk\n\n\n\n"
        ));
    }

    #[test]
    fn test_delete_node_record() {
        let mut buf = Vec::new();
        let mut writer = DumpWriter::new(&mut buf).unwrap();
        writer.delete_path("trunk/hello").unwrap();

        let text = String::from_utf8(buf).unwrap();
        assert!(text.ends_with("Node-path: trunk/hello\nNode-action: delete\n\n\n"));
    }

    #[test]
    fn test_file_node_with_props() {
        let mut props = PropList::new();
        props.push("svn:executable", "*");

        let mut buf = Vec::new();
        let mut writer = DumpWriter::new(&mut buf).unwrap();
        writer
            .add_file("trunk/run.sh", Some(&props), b"#!/bin/sh\n")
            .unwrap();

        let text = String::from_utf8(buf).unwrap();
        let prop_body = props.encode();
        assert!(text.contains(&format!("Prop-content-length: {}\n", prop_body.len())));
        assert!(text.contains(&format!(
            "Content-length: {}\n",
            prop_body.len() + b"#!/bin/sh\n".len()
        )));
        assert!(text.contains("K 14\nsvn:executable\nV 1\n*\n"));
    }
}
