//! Text encoding of manifests
//!
//! ```text
//! MANIFEST\t<format>
//! version:\t<version>
//! previous:\t<previous>
//! filecount:\t<filecount>
//! timestamp:\t<unix-time>
//! contentsize:\t<contentsize>
//! minversion:\t<minversion>      (optional)
//! includes:\t<bundle>            (zero or more)
//!
//! <flags>\t<hash>\t<version>\t<name>
//! ```

use std::fmt::Write as _;
use std::str::FromStr;

use crate::digest::Digest;
use crate::error::{Error, Result};
use crate::file::FileEntry;
use crate::flags::Flags;
use crate::manifest::{Manifest, ManifestHeader};

const MAGIC: &str = "MANIFEST";

impl Manifest {
    /// Serialize to the on-disk text form
    pub fn to_text(&self) -> String {
        let h = &self.header;
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = writeln!(out, "{}\t{}", MAGIC, h.format);
        let _ = writeln!(out, "version:\t{}", h.version);
        let _ = writeln!(out, "previous:\t{}", h.previous);
        let _ = writeln!(out, "filecount:\t{}", h.file_count);
        let _ = writeln!(out, "timestamp:\t{}", h.timestamp);
        let _ = writeln!(out, "contentsize:\t{}", h.content_size);
        if let Some(min_version) = h.min_version {
            let _ = writeln!(out, "minversion:\t{}", min_version);
        }
        for include in &h.includes {
            let _ = writeln!(out, "includes:\t{}", include);
        }
        out.push('\n');
        for entry in &self.files {
            let _ = writeln!(
                out,
                "{}\t{}\t{}\t{}",
                entry.flags, entry.hash, entry.version, entry.name
            );
        }
        out
    }

    /// Serialized bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_text().into_bytes()
    }

    /// Digest of the serialized form, as referenced from the MoM
    pub fn digest(&self) -> Digest {
        Digest::of(self.to_text().as_bytes())
    }

    /// Parse the text form. `name` is the bundle the manifest belongs to.
    pub fn parse(name: &str, text: &str) -> Result<Self> {
        let mut lines = text.lines().enumerate().map(|(idx, line)| (idx + 1, line));

        let (line_no, first) = lines
            .next()
            .ok_or_else(|| Error::parse(1, "empty manifest"))?;
        let format = match first.split_once('\t') {
            Some((MAGIC, value)) => parse_number(line_no, value)?,
            _ => return Err(Error::parse(line_no, "missing MANIFEST line")),
        };

        let mut header = ManifestHeader {
            format,
            ..Default::default()
        };
        let mut seen = [false; 5];
        let mut files = Vec::new();
        let mut in_files = false;

        for (line_no, line) in lines {
            if line.is_empty() {
                in_files = true;
                continue;
            }
            if !in_files {
                let field = line
                    .split_once(":\t")
                    .filter(|(key, _)| !key.contains('\t'));
                if let Some((key, value)) = field {
                    match key {
                        "version" => {
                            header.version = parse_number(line_no, value)?;
                            seen[0] = true;
                        }
                        "previous" => {
                            header.previous = parse_number(line_no, value)?;
                            seen[1] = true;
                        }
                        "filecount" => {
                            header.file_count = parse_number(line_no, value)?;
                            seen[2] = true;
                        }
                        "timestamp" => {
                            header.timestamp = parse_number(line_no, value)?;
                            seen[3] = true;
                        }
                        "contentsize" => {
                            header.content_size = parse_number(line_no, value)?;
                            seen[4] = true;
                        }
                        "minversion" => header.min_version = Some(parse_number(line_no, value)?),
                        "includes" => header.includes.push(value.to_string()),
                        _ => {
                            return Err(Error::parse(
                                line_no,
                                format!("unknown header field {:?}", key),
                            ))
                        }
                    }
                    continue;
                }
                // No blank separator: the first non-header line starts the file section.
                in_files = true;
            }
            files.push(parse_entry(line_no, line)?);
        }

        for (field, present) in ["version", "previous", "filecount", "timestamp", "contentsize"]
            .iter()
            .zip(seen)
        {
            if !present {
                return Err(Error::missing_field(*field));
            }
        }

        if header.file_count as usize != files.len() {
            return Err(Error::validation(format!(
                "filecount {} does not match {} entries",
                header.file_count,
                files.len()
            )));
        }

        let mut manifest = Manifest {
            name: name.to_string(),
            header,
            files,
        };
        manifest.sort_files();
        Ok(manifest)
    }
}

fn parse_number<T: FromStr>(line: usize, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::parse(line, format!("invalid number {:?}", value)))
}

fn parse_entry(line_no: usize, line: &str) -> Result<FileEntry> {
    let mut fields = line.splitn(4, '\t');
    let (Some(flags), Some(hash), Some(version), Some(name)) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(Error::parse(line_no, "file entry needs 4 fields"));
    };
    Ok(FileEntry {
        name: name.to_string(),
        version: parse_number(line_no, version)?,
        hash: hash.parse()?,
        flags: Flags::decode(flags)?,
        size: 0,
    })
}
