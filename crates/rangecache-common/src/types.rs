//! Core type definitions for rangecache
//!
//! This module defines the cache key that identifies a byte range of a file
//! and the file path format understood by the file service.

use crate::error::{Error, Result};
use derive_more::Display;
use std::fmt;

/// Separator between the service part and the file part of a path
const SERVICE_SEPARATOR: char = ':';

/// Separator between a service name and its arguments
const ARGUMENT_SEPARATOR: char = ',';

/// Identifies a byte range `[offset, offset + size)` of a file
///
/// The path is the namespace under which the range is registered with the
/// overlap checker.
#[derive(Clone, Debug, Display, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[display("{path}[{offset}+{size}]")]
pub struct CacheKey {
    pub path: String,
    pub offset: u64,
    pub size: u64,
}

impl CacheKey {
    pub fn new(path: impl Into<String>, offset: u64, size: u64) -> Self {
        Self {
            path: path.into(),
            offset,
            size,
        }
    }

    /// Half-open interval covered by this key
    #[must_use]
    pub fn interval(&self) -> (u64, u64) {
        (self.offset, self.offset.saturating_add(self.size))
    }
}

/// Parsed file path: `file` or `service[,arg...]:file`
#[derive(Clone, PartialEq, Eq)]
pub struct FilePath {
    pub service: Option<String>,
    pub service_arguments: Vec<String>,
    pub file: String,
}

impl FilePath {
    /// Parse a file service path
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::invalid_path("empty path"));
        }

        let (service_part, file) = match s.split_once(SERVICE_SEPARATOR) {
            Some((service, file)) => (Some(service), file),
            None => (None, s),
        };

        if file.is_empty() {
            return Err(Error::invalid_path(format!("{s:?}: empty file part")));
        }
        if let Some(c) = file.chars().find(|c| c.is_control()) {
            return Err(Error::invalid_path(format!(
                "{s:?}: invalid character {c:?} in file part"
            )));
        }

        let mut service = None;
        let mut service_arguments = Vec::new();
        if let Some(part) = service_part {
            let mut fields = part.split(ARGUMENT_SEPARATOR);
            let name = fields.next().unwrap_or_default();
            if name.is_empty() {
                return Err(Error::invalid_path(format!("{s:?}: empty service name")));
            }
            for arg in fields {
                if arg.is_empty() {
                    return Err(Error::invalid_path(format!(
                        "{s:?}: empty service argument"
                    )));
                }
                service_arguments.push(arg.to_string());
            }
            service = Some(name.to_string());
        }

        Ok(Self {
            service,
            service_arguments,
            file: file.to_string(),
        })
    }
}

impl fmt::Display for FilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(service) = &self.service {
            f.write_str(service)?;
            for arg in &self.service_arguments {
                write!(f, "{ARGUMENT_SEPARATOR}{arg}")?;
            }
            write!(f, "{SERVICE_SEPARATOR}")?;
        }
        f.write_str(&self.file)
    }
}

impl fmt::Debug for FilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FilePath({self})")
    }
}
